//! # Resolver 模块
//!
//! 资源按名查找的注入接口。
//!
//! 解析器在加载时通过 [`AssetResolver`] 把 ANM / GAS 中的资源名换成引用。
//! 查找失败不是错误：节点里存 `None`，执行时当作空操作。

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AnimResult;
use crate::timeline::Animation;
use crate::vertex::VertexAnimation;

/// 外部音频资源句柄
///
/// 音频播放不在本 crate 范围内，这里只保留规范化后的资源名，由 Host 解释。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioHandle {
    name: Arc<str>,
}

impl AudioHandle {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// 资源查找接口
///
/// 所有方法默认返回 `None`，实现方只需覆盖自己能提供的资源类型。
pub trait AssetResolver {
    /// 按名查找顶点动画（ACT）
    fn vertex_animation(&self, _name: &str) -> Option<Arc<VertexAnimation>> {
        None
    }

    /// 按名查找音频
    fn audio(&self, _name: &str) -> Option<AudioHandle> {
        None
    }

    /// 按名查找时间轴动画（ANM），GAS 的 ANIM / ONEOF 使用
    fn animation(&self, _name: &str) -> Option<Arc<Animation>> {
        None
    }
}

/// 什么都找不到的解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl AssetResolver for NullResolver {}

/// 规范化资源名：去掉扩展名并转为小写
///
/// ANM 里引用 `walk01`，磁盘上是 `WALK01.ACT`，两者应视为同一资源。
pub fn normalize_name(name: &str) -> String {
    let name = name.trim();
    let stem = match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    };
    stem.to_ascii_lowercase()
}

/// 内存资源表
///
/// 测试与离线工具使用；键为 [`normalize_name`] 的结果。
#[derive(Debug, Default, Clone)]
pub struct MemoryResolver {
    vertex_animations: HashMap<String, Arc<VertexAnimation>>,
    audio: HashMap<String, AudioHandle>,
    animations: HashMap<String, Arc<Animation>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册顶点动画
    pub fn insert_vertex_animation(&mut self, name: &str, anim: Arc<VertexAnimation>) {
        self.vertex_animations.insert(normalize_name(name), anim);
    }

    /// 解码 ACT 数据并注册
    pub fn load_vertex_animation(
        &mut self,
        name: &str,
        data: &[u8],
    ) -> AnimResult<Arc<VertexAnimation>> {
        let anim = Arc::new(VertexAnimation::from_bytes(&normalize_name(name), data)?);
        self.insert_vertex_animation(name, anim.clone());
        Ok(anim)
    }

    /// 注册音频（只记录名字）
    pub fn insert_audio(&mut self, name: &str) {
        let key = normalize_name(name);
        self.audio.insert(key.clone(), AudioHandle::new(&key));
    }

    /// 注册时间轴动画
    pub fn insert_animation(&mut self, anim: Arc<Animation>) {
        self.animations.insert(normalize_name(anim.name()), anim);
    }

    /// 已注册资源总数
    pub fn len(&self) -> usize {
        self.vertex_animations.len() + self.audio.len() + self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetResolver for MemoryResolver {
    fn vertex_animation(&self, name: &str) -> Option<Arc<VertexAnimation>> {
        self.vertex_animations.get(&normalize_name(name)).cloned()
    }

    fn audio(&self, name: &str) -> Option<AudioHandle> {
        self.audio.get(&normalize_name(name)).cloned()
    }

    fn animation(&self, name: &str) -> Option<Arc<Animation>> {
        self.animations.get(&normalize_name(name)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("WALK01.ACT"), "walk01");
        assert_eq!(normalize_name(" walk01 "), "walk01");
        assert_eq!(normalize_name("a.b.anm"), "a.b");
        assert_eq!(normalize_name(".hidden"), ".hidden");
    }

    #[test]
    fn test_memory_resolver_audio_lookup() {
        let mut resolver = MemoryResolver::new();
        resolver.insert_audio("DoorCreak.wav");

        let handle = resolver.audio("doorcreak").unwrap();
        assert_eq!(handle.name(), "doorcreak");
        assert!(resolver.audio("missing").is_none());
        assert!(resolver.vertex_animation("doorcreak").is_none());
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn test_load_vertex_animation_rejects_bad_data() {
        let mut resolver = MemoryResolver::new();
        let err = resolver.load_vertex_animation("walk01.act", b"nope").unwrap_err();
        assert!(matches!(err, crate::error::AnimError::Act(_)));
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_null_resolver() {
        let resolver = NullResolver;
        assert!(resolver.audio("x").is_none());
        assert!(resolver.animation("x").is_none());
    }
}
