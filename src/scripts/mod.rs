//! 页面脚本资源
//!
//! 所有在页面中执行的 JavaScript 均以 `.js` 文件形式随源码签入，
//! 通过 `include_str!` 嵌入。每个脚本是一个函数表达式，
//! 由 [`ScriptBridge::call`](crate::cdp::ScriptBridge::call) 以位置参数调用。
//!
//! 每个脚本都有对应的 [`ScriptCall`] 实现，声明参数顺序与返回结构，
//! 使客户端与页面脚本之间的契约可以在 Rust 侧进行类型检查。

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::snapshot::{ElementRef, Filter, Snapshot};

/// 签入的页面脚本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Script {
    /// 脚本名称
    pub name: &'static str,
    /// 契约版本，参数或返回结构变化时递增
    pub version: u32,
    /// 函数表达式源码
    pub source: &'static str,
}

/// 可访问性快照：`(filter, maxDepth, arenaKey) -> Snapshot`
pub const SNAPSHOT: Script = Script {
    name: "snapshot",
    version: 3,
    source: include_str!("snapshot.js"),
};

/// ref 坐标查询：`(index, generation, arenaKey) -> {x, y} | {error}`
pub const LOCATE_REF: Script = Script {
    name: "locate_ref",
    version: 1,
    source: include_str!("locate_ref.js"),
};

/// 原生点击：`(index, generation, arenaKey) -> {ok} | {error}`
pub const CLICK_REF: Script = Script {
    name: "click_ref",
    version: 1,
    source: include_str!("click_ref.js"),
};

/// 填充输入：`(index, generation, arenaKey, text) -> {ok} | {error}`
pub const FILL_REF: Script = Script {
    name: "fill_ref",
    version: 1,
    source: include_str!("fill_ref.js"),
};

/// 正文提取：`(limit) -> string`
pub const PAGE_TEXT: Script = Script {
    name: "page_text",
    version: 2,
    source: include_str!("page_text.js"),
};

/// 页面尺寸：`() -> PageMetrics`
pub const PAGE_METRICS: Script = Script {
    name: "page_metrics",
    version: 1,
    source: include_str!("page_metrics.js"),
};

/// 滚动到顶部/底部：`(edge) -> {x, y}`
pub const SCROLL_EDGE: Script = Script {
    name: "scroll_edge",
    version: 1,
    source: include_str!("scroll_edge.js"),
};

/// 文档状态：`() -> PageState`
pub const READY_STATE: Script = Script {
    name: "ready_state",
    version: 1,
    source: include_str!("ready_state.js"),
};

/// 全部脚本
pub const ALL: [&Script; 8] = [
    &SNAPSHOT,
    &LOCATE_REF,
    &CLICK_REF,
    &FILL_REF,
    &PAGE_TEXT,
    &PAGE_METRICS,
    &SCROLL_EDGE,
    &READY_STATE,
];

/// 页面中 ref 表所在的全局属性名
pub const ARENA_KEY: &str = "__chaserPilotRefs";

/// 脚本调用契约
pub trait ScriptCall {
    /// 脚本返回值的结构
    type Output: DeserializeOwned;

    /// 被调用的脚本
    fn script(&self) -> &'static Script;

    /// 位置参数
    fn args(&self) -> Vec<Value>;
}

fn ref_args(target: &ElementRef) -> Vec<Value> {
    vec![
        json!(target.index()),
        json!(target.generation()),
        json!(ARENA_KEY),
    ]
}

/// 按 ref 操作的脚本返回值
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RefReply<T> {
    /// ref 已失效
    Missing { error: String },
    Found(T),
}

/// 元素中心点（视口坐标）
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, serde::Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// 操作确认
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

/// 文档与视口尺寸
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetrics {
    pub scroll_width: f64,
    pub scroll_height: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub device_pixel_ratio: f64,
}

/// 文档加载状态
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    pub ready_state: String,
    pub url: String,
    pub title: String,
}

/// 快照调用
#[derive(Debug, Clone, Copy)]
pub struct SnapshotCall {
    pub filter: Filter,
    pub max_depth: u32,
}

impl ScriptCall for SnapshotCall {
    type Output = Snapshot;

    fn script(&self) -> &'static Script {
        &SNAPSHOT
    }

    fn args(&self) -> Vec<Value> {
        vec![
            json!(self.filter.as_str()),
            json!(self.max_depth),
            json!(ARENA_KEY),
        ]
    }
}

/// 坐标查询调用
#[derive(Debug, Clone)]
pub struct LocateRefCall<'a> {
    pub target: &'a ElementRef,
}

impl ScriptCall for LocateRefCall<'_> {
    type Output = RefReply<Point>;

    fn script(&self) -> &'static Script {
        &LOCATE_REF
    }

    fn args(&self) -> Vec<Value> {
        ref_args(self.target)
    }
}

/// 原生点击调用
#[derive(Debug, Clone)]
pub struct ClickRefCall<'a> {
    pub target: &'a ElementRef,
}

impl ScriptCall for ClickRefCall<'_> {
    type Output = RefReply<Ack>;

    fn script(&self) -> &'static Script {
        &CLICK_REF
    }

    fn args(&self) -> Vec<Value> {
        ref_args(self.target)
    }
}

/// 填充调用
#[derive(Debug, Clone)]
pub struct FillRefCall<'a> {
    pub target: &'a ElementRef,
    pub text: &'a str,
}

impl ScriptCall for FillRefCall<'_> {
    type Output = RefReply<Ack>;

    fn script(&self) -> &'static Script {
        &FILL_REF
    }

    fn args(&self) -> Vec<Value> {
        let mut args = ref_args(self.target);
        args.push(json!(self.text));
        args
    }
}

/// 正文提取调用
#[derive(Debug, Clone, Copy)]
pub struct PageTextCall {
    pub limit: usize,
}

impl ScriptCall for PageTextCall {
    type Output = String;

    fn script(&self) -> &'static Script {
        &PAGE_TEXT
    }

    fn args(&self) -> Vec<Value> {
        vec![json!(self.limit)]
    }
}

/// 页面尺寸调用
#[derive(Debug, Clone, Copy)]
pub struct PageMetricsCall;

impl ScriptCall for PageMetricsCall {
    type Output = PageMetrics;

    fn script(&self) -> &'static Script {
        &PAGE_METRICS
    }

    fn args(&self) -> Vec<Value> {
        Vec::new()
    }
}

/// 滚动边缘
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
}

/// 滚动到边缘调用
#[derive(Debug, Clone, Copy)]
pub struct ScrollEdgeCall {
    pub edge: Edge,
}

impl ScriptCall for ScrollEdgeCall {
    type Output = Point;

    fn script(&self) -> &'static Script {
        &SCROLL_EDGE
    }

    fn args(&self) -> Vec<Value> {
        let edge = match self.edge {
            Edge::Top => "top",
            Edge::Bottom => "bottom",
        };
        vec![json!(edge)]
    }
}

/// 文档状态调用
#[derive(Debug, Clone, Copy)]
pub struct ReadyStateCall;

impl ScriptCall for ReadyStateCall {
    type Output = PageState;

    fn script(&self) -> &'static Script {
        &READY_STATE
    }

    fn args(&self) -> Vec<Value> {
        Vec::new()
    }
}
