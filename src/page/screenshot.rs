//! Screenshot capture

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::Page;
use crate::cdp::command::{CaptureScreenshotParams, Command, DeviceMetricsParams};
use crate::scripts::PageMetricsCall;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct CaptureResponse {
    data: String,
}

impl Page {
    /// Capture a PNG of the viewport, or of the whole document when `full_page` is set.
    ///
    /// A full-page capture resizes the emulated viewport to the document and
    /// clears the override afterwards, whether or not the capture succeeded.
    #[instrument(skip(self))]
    pub async fn screenshot(&mut self, full_page: bool) -> Result<Vec<u8>> {
        if !full_page {
            return self.capture(false).await;
        }

        let metrics = self.bridge.call(&PageMetricsCall).await?;
        let params = DeviceMetricsParams {
            width: metrics.scroll_width.ceil() as u32,
            height: metrics.scroll_height.ceil() as u32,
            device_scale_factor: metrics.device_pixel_ratio,
            mobile: false,
        };
        info!("Full-page capture at {}x{}", params.width, params.height);

        let captured = match self
            .dispatcher()
            .send(Command::SetDeviceMetricsOverride(params))
            .await
        {
            Ok(_) => self.capture(true).await,
            Err(e) => Err(e),
        };

        let restored = self
            .dispatcher()
            .send(Command::ClearDeviceMetricsOverride)
            .await;

        match (captured, restored) {
            (Ok(png), Ok(_)) => Ok(png),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), restored) => {
                if let Err(restore_error) = restored {
                    warn!("Failed to clear device metrics override: {}", restore_error);
                }
                Err(e)
            }
        }
    }

    async fn capture(&mut self, beyond_viewport: bool) -> Result<Vec<u8>> {
        let result = self
            .dispatcher()
            .send(Command::CaptureScreenshot(CaptureScreenshotParams {
                format: "png".to_string(),
                capture_beyond_viewport: beyond_viewport,
            }))
            .await?;

        let response: CaptureResponse = serde_json::from_value(result)?;
        STANDARD
            .decode(response.data.as_bytes())
            .map_err(|e| Error::script(format!("Screenshot data is not valid base64: {}", e)))
    }
}
