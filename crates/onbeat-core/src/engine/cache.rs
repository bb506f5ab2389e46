//! Bounded memoization of tessellated rings
//!
//! Approach rings change scale every frame, so the scale is bucketed to a fixed
//! resolution before it becomes part of the key. Radius and stroke are keyed at
//! quarter-pixel precision. Meshes carry no color, so every pattern of a
//! beatmap shares one set of rings per scale bucket.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::config::RenderConfig;
use crate::types::Point;

/// Sub-pixel precision for radius and stroke keys
const LENGTH_QUANTUM: f32 = 4.0;

/// Cache key for one ring mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RingKey {
    radius_q: u32,
    stroke_q: u32,
    scale_bucket: u32,
}

/// A ring as a closed triangle strip centered on the origin
///
/// Vertices alternate inner and outer edge; the last pair repeats the first.
#[derive(Debug, Clone, PartialEq)]
pub struct RingMesh {
    pub vertices: Vec<Point>,
    pub inner_radius: f32,
    pub outer_radius: f32,
}

impl RingMesh {
    fn tessellate(inner_radius: f32, outer_radius: f32, segments: usize) -> Self {
        let mut vertices = Vec::with_capacity((segments + 1) * 2);
        for i in 0..=segments {
            let dir = Point::from_angle(std::f32::consts::TAU * (i % segments) as f32 / segments as f32);
            vertices.push(dir * inner_radius);
            vertices.push(dir * outer_radius);
        }
        Self {
            vertices,
            inner_radius,
            outer_radius,
        }
    }
}

/// LRU of ring meshes
pub struct RenderCache {
    rings: LruCache<RingKey, Arc<RingMesh>>,
    scale_buckets: u32,
    segments: usize,
    hits: u64,
    misses: u64,
}

impl RenderCache {
    pub fn new(config: &RenderConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            rings: LruCache::new(capacity),
            scale_buckets: config.scale_buckets.max(1),
            segments: config.ring_segments.max(3),
            hits: 0,
            misses: 0,
        }
    }

    /// Quantize an approach scale to its bucket
    pub fn bucket(&self, scale: f32) -> u32 {
        (scale.max(0.0) * self.scale_buckets as f32).round() as u32
    }

    /// Ring for a pattern radius and stroke at an approach scale
    ///
    /// The mesh is built at the bucketed scale, so nearby scales share it.
    pub fn ring(&mut self, radius: f32, stroke: f32, scale: f32) -> Arc<RingMesh> {
        let key = RingKey {
            radius_q: (radius.max(0.0) * LENGTH_QUANTUM).round() as u32,
            stroke_q: (stroke.max(0.0) * LENGTH_QUANTUM).round() as u32,
            scale_bucket: self.bucket(scale),
        };

        if let Some(mesh) = self.rings.get(&key) {
            self.hits += 1;
            return Arc::clone(mesh);
        }

        self.misses += 1;
        let bucket_scale = key.scale_bucket as f32 / self.scale_buckets as f32;
        let inner = key.radius_q as f32 / LENGTH_QUANTUM * bucket_scale;
        let outer = inner + key.stroke_q as f32 / LENGTH_QUANTUM;
        let mesh = Arc::new(RingMesh::tessellate(inner, outer, self.segments));
        self.rings.put(key, Arc::clone(&mesh));
        mesh
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rings.cap().get()
    }

    /// `(hits, misses)` since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> RenderCache {
        RenderCache::new(&RenderConfig {
            cache_capacity: capacity,
            ..Default::default()
        })
    }

    #[test]
    fn test_nearby_scales_share_a_mesh() {
        let mut cache = cache(16);
        let a = cache.ring(30.0, 5.0, 1.500);
        let b = cache.ring(30.0, 5.0, 1.501);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_capacity_is_bounded() {
        let mut cache = cache(8);
        for i in 0..100 {
            cache.ring(30.0, 5.0, 1.0 + i as f32 * 0.1);
        }
        assert_eq!(cache.len(), 8);
        assert_eq!(cache.capacity(), 8);
    }

    #[test]
    fn test_size_is_part_of_key() {
        let mut cache = cache(16);
        let a = cache.ring(30.0, 5.0, 1.0);
        let b = cache.ring(30.0, 6.0, 1.0);
        let c = cache.ring(28.0, 5.0, 1.0);
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(Arc::ptr_eq(&a, &cache.ring(30.0, 5.0, 1.0)));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_ring_geometry() {
        let mut cache = cache(4);
        let ring = cache.ring(20.0, 4.0, 2.0);
        assert_eq!(ring.inner_radius, 40.0);
        assert_eq!(ring.outer_radius, 44.0);
        assert_eq!(ring.vertices.len(), (RenderConfig::default().ring_segments + 1) * 2);
        assert!((ring.vertices[0].length() - 40.0).abs() < 1e-3);
        assert!((ring.vertices[1].length() - 44.0).abs() < 1e-3);
    }
}
