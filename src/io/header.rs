//! The structured header describing the blocks of a written payload.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::Box3;

/// Element format of a payload block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Three `f32`s per element.
    Vec3f,
    /// One quantized position per element.
    Uint64,
    /// One `f32` per element.
    Float,
}

impl Format {
    pub fn tag(&self) -> &'static str {
        match self {
            Format::Vec3f => "vec3f",
            Format::Uint64 => "uint64",
            Format::Float => "float",
        }
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        match self {
            Format::Vec3f => 12,
            Format::Uint64 => 8,
            Format::Float => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Position,
    Attribute,
}

/// One array in the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    /// Attribute name; `None` for positions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Byte offset into the payload.
    pub offset: u64,
    /// Number of elements.
    pub count: u64,
    pub format: Format,
}

impl Block {
    /// Size of the block in bytes.
    pub fn byte_len(&self) -> usize {
        self.count as usize * self.format.element_size()
    }
}

/// Everything a reader needs to interpret a payload as a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Payload blocks, in the order they were written.
    pub blocks: Vec<Block>,
    /// Render radius; only present if positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    /// Lower and upper corners of the quantization box; only present for quantized positions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[[f32; 3]; 2]>,
    pub use_old_alpha_spheres_code: bool,
}

impl Header {
    /// The block holding positions.
    pub fn positions(&self) -> Option<&Block> {
        self.blocks.iter().find(|b| b.kind == BlockKind::Position)
    }

    /// The attribute block called `name`.
    pub fn attribute(&self, name: &str) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|b| b.kind == BlockKind::Attribute && b.name.as_deref() == Some(name))
    }

    /// The quantization box, if positions are quantized.
    pub fn quantization_bounds(&self) -> Option<Box3> {
        self.bounds
            .map(|[lower, upper]| Box3::new(lower.into(), upper.into()))
    }

    /// Render the header as an XML document.
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\"?>\n");
        xml.push_str("<OSPRay>\n");
        xml.push_str("<PKDGeometry>\n");
        for block in self.blocks.iter() {
            let element = match block.kind {
                BlockKind::Position => "position",
                BlockKind::Attribute => "attribute",
            };
            let name = block
                .name
                .as_deref()
                .map(|name| format!(" name=\"{}\"", escape(name)))
                .unwrap_or_default();
            xml.push_str(&format!(
                "<{}{} ofs=\"{}\" count=\"{}\" format=\"{}\"/>\n",
                element,
                name,
                block.offset,
                block.count,
                block.format.tag()
            ));
        }
        if let Some([lower, upper]) = self.bounds {
            xml.push_str(&format!(
                "<bounds lower=\"{} {} {}\" upper=\"{} {} {}\"/>\n",
                lower[0], lower[1], lower[2], upper[0], upper[1], upper[2]
            ));
        }
        if let Some(radius) = self.radius {
            xml.push_str(&format!("<radius>{:.6}</radius>\n", radius));
        }
        xml.push_str(&format!(
            "<useOldAlphaSpheresCode value=\"{}\"/>\n",
            u8::from(self.use_old_alpha_spheres_code)
        ));
        xml.push_str("</PKDGeometry>\n");
        xml.push_str("</OSPRay>\n");
        xml
    }

    pub fn write_xml(&self, out: &mut impl Write) -> Result<()> {
        out.write_all(self.to_xml().as_bytes())?;
        Ok(())
    }

    pub fn write_json(&self, out: &mut impl Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}
