//! Shaders of the noisescope harness.
//!
//! GLSL sources live in `shaders/`. Pipelines load compiled SPIR-V files at
//! runtime from [`shader_dir`]; with the default `compile` feature the build
//! script produces them with shaderc.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// First word of every SPIR-V module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Environment variable overriding the shader directory.
pub const SHADER_DIR_ENV: &str = "NOISESCOPE_SHADER_DIR";

/// SPIR-V file names of the `test` pipeline.
pub const TEST_VERT: &str = "test.vert.spv";
pub const TEST_FRAG: &str = "test.frag.spv";
/// SPIR-V file names of the `texture` pipeline.
pub const TEXTURE_VERT: &str = "texture.vert.spv";
pub const TEXTURE_FRAG: &str = "texture.frag.spv";

/// Errors from reading SPIR-V.
#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bytecode length {0} is not a multiple of 4")]
    Misaligned(usize),

    #[error("bytecode is empty")]
    Empty,

    #[error("bad SPIR-V magic number {0:#010x}")]
    BadMagic(u32),
}

/// Convert raw bytes into SPIR-V words, checking length and magic number.
pub fn bytes_to_spirv(bytes: &[u8]) -> Result<Vec<u32>, ShaderError> {
    if bytes.len() % 4 != 0 {
        return Err(ShaderError::Misaligned(bytes.len()));
    }

    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    match words.first() {
        None => Err(ShaderError::Empty),
        Some(&SPIRV_MAGIC) => Ok(words),
        Some(&other) => Err(ShaderError::BadMagic(other)),
    }
}

/// Read a SPIR-V file.
pub fn load_spirv(path: impl AsRef<Path>) -> Result<Vec<u32>, ShaderError> {
    let bytes = std::fs::read(path)?;
    bytes_to_spirv(&bytes)
}

/// Directory compiled shaders are loaded from.
///
/// `NOISESCOPE_SHADER_DIR` wins; otherwise the build output of the `compile`
/// feature, otherwise `./shaders`.
pub fn shader_dir() -> PathBuf {
    resolve_shader_dir(std::env::var_os(SHADER_DIR_ENV).map(PathBuf::from))
}

fn resolve_shader_dir(overridden: Option<PathBuf>) -> PathBuf {
    overridden
        .or_else(|| option_env!("NOISESCOPE_COMPILED_SHADER_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("shaders"))
}

/// Path of shader file `name` inside [`shader_dir`].
pub fn shader_path(name: &str) -> PathBuf {
    shader_dir().join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn valid_words_are_decoded() {
        let bytes = module_bytes(&[SPIRV_MAGIC, 0x0001_0000, 42]);
        let words = bytes_to_spirv(&bytes).unwrap();
        assert_eq!(words, [SPIRV_MAGIC, 0x0001_0000, 42]);
    }

    #[test]
    fn misaligned_bytes_are_rejected() {
        let mut bytes = module_bytes(&[SPIRV_MAGIC]);
        bytes.push(0);
        assert!(matches!(
            bytes_to_spirv(&bytes),
            Err(ShaderError::Misaligned(5))
        ));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let bytes = module_bytes(&[0xDEAD_BEEF]);
        assert!(matches!(
            bytes_to_spirv(&bytes),
            Err(ShaderError::BadMagic(0xDEAD_BEEF))
        ));
        assert!(matches!(bytes_to_spirv(&[]), Err(ShaderError::Empty)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("noisescope-missing-shader.spv");
        assert!(matches!(load_spirv(path), Err(ShaderError::Io(_))));
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "noisescope-shader-{}.spv",
            std::process::id()
        ));
        std::fs::write(&path, module_bytes(&[SPIRV_MAGIC, 7])).unwrap();

        let words = load_spirv(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(words, [SPIRV_MAGIC, 7]);
    }

    #[test]
    fn override_wins() {
        let dir = resolve_shader_dir(Some(PathBuf::from("/opt/spv")));
        assert_eq!(dir, PathBuf::from("/opt/spv"));
    }

    #[cfg(feature = "compile")]
    #[test]
    fn default_build_ships_every_shader() {
        let dir = resolve_shader_dir(None);
        assert_ne!(dir, PathBuf::from("shaders"));

        for name in [TEST_VERT, TEST_FRAG, TEXTURE_VERT, TEXTURE_FRAG] {
            let words = load_spirv(dir.join(name)).unwrap();
            assert_eq!(words[0], SPIRV_MAGIC, "{name}");
        }
    }
}
