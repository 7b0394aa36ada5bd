use tracing::debug;

use crate::backend::{Backend, TextureId};
use crate::error::StereoError;
use crate::types::{Eye, Viewport};

#[derive(Debug, Default, Clone, Copy)]
struct ViewSlot {
    texture: Option<TextureId>,
    width: u32,
    height: u32,
    submitted: bool,
}

/// Persistent per-eye capture textures.
///
/// A slot's texture is reallocated only when a capture asks for different
/// dimensions than the ones it was created with.
#[derive(Debug, Default)]
pub struct ViewTextureCache {
    slots: [ViewSlot; 2],
}

impl ViewTextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the eye's texture, allocating or resizing it first if needed.
    pub fn ensure<B: Backend>(
        &mut self,
        backend: &mut B,
        eye: Eye,
        width: u32,
        height: u32,
    ) -> Result<TextureId, StereoError> {
        let slot = &mut self.slots[eye.index()];
        if let Some(texture) = slot.texture {
            if slot.width == width && slot.height == height {
                return Ok(texture);
            }
            debug!(
                %eye,
                old_width = slot.width,
                old_height = slot.height,
                width,
                height,
                "view texture size changed; reallocating"
            );
            backend.destroy_texture(texture);
            slot.texture = None;
            slot.submitted = false;
        }

        let texture = backend.create_view_texture(width, height)?;
        *slot = ViewSlot {
            texture: Some(texture),
            width,
            height,
            submitted: false,
        };
        Ok(texture)
    }

    /// Copies `region` of the current read target into the eye's texture and
    /// marks the eye submitted for this frame.
    pub fn capture<B: Backend>(
        &mut self,
        backend: &mut B,
        eye: Eye,
        region: Viewport,
    ) -> Result<TextureId, StereoError> {
        let texture = self.ensure(backend, eye, region.width, region.height)?;
        backend.copy_read_target(texture, region)?;
        self.slots[eye.index()].submitted = true;
        Ok(texture)
    }

    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.submitted = false;
        }
    }

    pub fn is_submitted(&self, eye: Eye) -> bool {
        self.slots[eye.index()].submitted
    }

    /// The eye's texture if it was captured since the last reset.
    pub fn submitted(&self, eye: Eye) -> Option<TextureId> {
        let slot = &self.slots[eye.index()];
        slot.texture.filter(|_| slot.submitted)
    }

    pub fn dimensions(&self, eye: Eye) -> Option<(u32, u32)> {
        let slot = &self.slots[eye.index()];
        slot.texture.map(|_| (slot.width, slot.height))
    }

    pub fn release<B: Backend>(&mut self, backend: &mut B) {
        for slot in &mut self.slots {
            if let Some(texture) = slot.texture.take() {
                backend.destroy_texture(texture);
            }
            *slot = ViewSlot::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{Command, RecordingBackend};

    fn creations(backend: &RecordingBackend) -> usize {
        backend
            .commands()
            .iter()
            .filter(|command| matches!(command, Command::CreateTexture { .. }))
            .count()
    }

    #[test]
    fn reallocates_only_on_size_change() {
        let mut backend = RecordingBackend::new(640, 480);
        let mut cache = ViewTextureCache::new();

        cache.ensure(&mut backend, Eye::Left, 640, 480).unwrap();
        cache.ensure(&mut backend, Eye::Left, 640, 480).unwrap();
        assert_eq!(creations(&backend), 1);

        cache.ensure(&mut backend, Eye::Left, 320, 480).unwrap();
        assert_eq!(creations(&backend), 2);
        assert_eq!(backend.live_textures(), 1);
        assert_eq!(cache.dimensions(Eye::Left), Some((320, 480)));
        assert_eq!(cache.dimensions(Eye::Right), None);
    }

    #[test]
    fn capture_marks_submission_until_reset() {
        let mut backend = RecordingBackend::new(64, 64);
        let mut cache = ViewTextureCache::new();
        let texture = cache
            .capture(&mut backend, Eye::Right, Viewport::full(64, 64))
            .unwrap();
        assert_eq!(cache.submitted(Eye::Right), Some(texture));
        assert_eq!(cache.submitted(Eye::Left), None);

        cache.reset();
        assert!(!cache.is_submitted(Eye::Right));
        assert_eq!(cache.dimensions(Eye::Right), Some((64, 64)));
    }

    #[test]
    fn failed_copy_leaves_eye_unsubmitted() {
        let mut backend = RecordingBackend::new(64, 64);
        backend.set_read_target(false);
        let mut cache = ViewTextureCache::new();
        let err = cache
            .capture(&mut backend, Eye::Left, Viewport::full(64, 64))
            .unwrap_err();
        assert_eq!(err, StereoError::MissingReadTarget);
        assert!(!cache.is_submitted(Eye::Left));
    }

    #[test]
    fn release_destroys_both_textures() {
        let mut backend = RecordingBackend::new(8, 8);
        let mut cache = ViewTextureCache::new();
        for eye in Eye::BOTH {
            cache.ensure(&mut backend, eye, 8, 8).unwrap();
        }
        cache.release(&mut backend);
        assert_eq!(backend.live_textures(), 0);
    }
}
