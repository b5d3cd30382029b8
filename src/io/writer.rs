use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bytemuck::cast_slice;

use crate::error::Result;
use crate::geometry::Axis;
use crate::io::header::{Block, BlockKind, Format, Header};
use crate::io::quantize;
use crate::io::sink::{PayloadSink, StreamSink};
use crate::pkd::axis::split_key;
use crate::pkd::PkdTree;

/// Name of the block holding the particle types.
pub const TYPE_ATTRIBUTE_NAME: &str = "atomType";

/// How the header is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderFormat {
    #[default]
    Xml,
    Json,
}

/// Options for [`PkdWriter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Write positions as 64-bit quantized values instead of `vec3f`.
    pub quantize: bool,
    pub header_format: HeaderFormat,
}

impl WriteOptions {
    pub fn with_quantize(mut self, quantize: bool) -> Self {
        self.quantize = quantize;
        self
    }

    pub fn with_header_format(mut self, header_format: HeaderFormat) -> Self {
        self.header_format = header_format;
        self
    }
}

/// Writes a [`PkdTree`] as a binary payload plus a header describing it.
///
/// The payload holds, in order: the positions, every attribute in the order it was first added,
/// and the types widened to `f32` if there are any. Particles keep their tree order, so a reader
/// can use the arrays as a tree directly.
#[derive(Debug, Clone, Default)]
pub struct PkdWriter {
    options: WriteOptions,
}

impl PkdWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Append all blocks of `tree` to `payload` and describe them in the returned header.
    pub fn write_payload(&self, tree: &PkdTree, payload: &mut impl PayloadSink) -> Result<Header> {
        let particles = tree.particles();
        let count = particles.len() as u64;
        let mut blocks = vec![];

        let bounds = if self.options.quantize {
            let bounds = tree.bounds();
            let quantized: Vec<u64> = particles
                .positions
                .iter()
                .enumerate()
                .map(|(node, p)| {
                    let axis_bits = tree.axis(node).map_or(0, |axis| axis as u32);
                    let mut p = *p;
                    p.x = split_key(&p, Axis::X);
                    quantize::encode(&p, axis_bits, &bounds)
                })
                .collect();
            let offset = payload.append(cast_slice(&quantized))?;
            blocks.push(Block {
                kind: BlockKind::Position,
                name: None,
                offset,
                count,
                format: Format::Uint64,
            });
            Some([
                [bounds.lower.x, bounds.lower.y, bounds.lower.z],
                [bounds.upper.x, bounds.upper.y, bounds.upper.z],
            ])
        } else {
            let offset = payload.append(cast_slice(&particles.positions))?;
            blocks.push(Block {
                kind: BlockKind::Position,
                name: None,
                offset,
                count,
                format: Format::Vec3f,
            });
            None
        };

        for attribute in particles.attributes() {
            let offset = payload.append(cast_slice(attribute.values()))?;
            blocks.push(Block {
                kind: BlockKind::Attribute,
                name: Some(attribute.name().to_string()),
                offset,
                count,
                format: Format::Float,
            });
        }

        if !particles.types.is_empty() {
            let widened: Vec<f32> = particles.types.iter().map(|&t| t as f32).collect();
            let offset = payload.append(cast_slice(&widened))?;
            blocks.push(Block {
                kind: BlockKind::Attribute,
                name: Some(TYPE_ATTRIBUTE_NAME.to_string()),
                offset,
                count,
                format: Format::Float,
            });
        }

        Ok(Header {
            blocks,
            radius: (particles.radius > 0.0).then_some(particles.radius),
            bounds,
            use_old_alpha_spheres_code: false,
        })
    }

    /// Write the payload of `tree` to `payload` and its header to `header`.
    pub fn write(
        &self,
        tree: &PkdTree,
        header: &mut impl Write,
        payload: &mut impl PayloadSink,
    ) -> Result<Header> {
        let written = self.write_payload(tree, payload)?;
        log::debug!("writing header for {} blocks", written.blocks.len());
        match self.options.header_format {
            HeaderFormat::Xml => written.write_xml(header)?,
            HeaderFormat::Json => written.write_json(header)?,
        }
        Ok(written)
    }

    /// Write the header to `path` and the payload next to it, at [`payload_path`]`(path)`.
    pub fn save(&self, tree: &PkdTree, path: impl AsRef<Path>) -> Result<Header> {
        let path = path.as_ref();
        let payload_path = payload_path(path);
        log::info!(
            "writing {} particles to {} and {}",
            tree.len(),
            path.display(),
            payload_path.display()
        );

        let mut header = BufWriter::new(File::create(path)?);
        let mut payload = StreamSink::new(BufWriter::new(File::create(&payload_path)?));
        let written = self.write(tree, &mut header, &mut payload)?;
        header.flush()?;
        payload.flush()?;
        Ok(written)
    }
}

/// Where [`PkdWriter::save`] puts the payload for a header at `path`: `path` with "bin" appended.
pub fn payload_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push("bin");
    PathBuf::from(name)
}
