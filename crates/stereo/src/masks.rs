use crate::backend::{Backend, TextureId};
use crate::error::StereoError;
use crate::mode::MaskPattern;

/// Lazily created 2x2 interleave masks, one per pattern, kept for the
/// lifetime of the session.
#[derive(Debug, Default)]
pub(crate) struct MaskTextures {
    textures: [Option<TextureId>; 3],
}

impl MaskTextures {
    pub fn get<B: Backend>(
        &mut self,
        backend: &mut B,
        pattern: MaskPattern,
    ) -> Result<TextureId, StereoError> {
        let slot = &mut self.textures[pattern.index()];
        if let Some(texture) = *slot {
            return Ok(texture);
        }
        let texture = backend.create_mask_texture(pattern)?;
        *slot = Some(texture);
        Ok(texture)
    }

    pub fn release<B: Backend>(&mut self, backend: &mut B) {
        for texture in self.textures.iter_mut().filter_map(Option::take) {
            backend.destroy_texture(texture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{RecordingBackend, TextureKind};

    #[test]
    fn masks_are_created_once_per_pattern() {
        let mut backend = RecordingBackend::new(2, 2);
        let mut masks = MaskTextures::default();
        let rows = masks.get(&mut backend, MaskPattern::Rows).unwrap();
        assert_eq!(masks.get(&mut backend, MaskPattern::Rows).unwrap(), rows);
        let checker = masks.get(&mut backend, MaskPattern::Checkerboard).unwrap();
        assert_ne!(rows, checker);
        assert_eq!(
            backend.texture_kind(checker),
            Some(TextureKind::Mask(MaskPattern::Checkerboard))
        );

        masks.release(&mut backend);
        assert_eq!(backend.live_textures(), 0);
    }
}
