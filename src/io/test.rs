use std::fs::read;
use std::io::{Cursor, Seek, SeekFrom, Write};

use bytemuck::pod_read_unaligned;

use crate::geometry::{Axis, Point3};
use crate::io::{
    payload_path, quantize, Block, BlockKind, Format, Header, HeaderFormat, PayloadSink,
    PkdWriter, SharedSink, StreamSink, WriteOptions,
};
use crate::particles::ParticleSet;
use crate::pkd::axis::split_key;
use crate::pkd::{PkdBuilder, PkdTree};

fn four_point_tree() -> PkdTree {
    let particles = ParticleSet::from_positions(vec![
        Point3::new(0.5, 1.0, 2.0),
        Point3::new(-3.0, 0.25, 8.0),
        Point3::new(4.0, -1.0, 0.0),
        Point3::new(1.5, 6.0, -2.0),
    ]);
    PkdBuilder::new().build(particles).unwrap()
}

fn attributed_tree() -> PkdTree {
    let mut particles = ParticleSet::new();
    particles.radius = 0.25;
    for i in 0..20 {
        let name = if i % 3 == 0 { "C" } else { "O" };
        particles.push(Point3::new(i as f32, (i * 7 % 5) as f32, 0.5 * i as f32));
        particles.add_attribute("temperature", 100. + i as f32);
        particles.add_attribute("id", i as f32);
        let id = particles.type_id(name);
        particles.types.push(id);
    }
    PkdBuilder::new().build(particles).unwrap()
}

fn read_block<T: bytemuck::AnyBitPattern>(payload: &[u8], block: &Block) -> Vec<T> {
    let start = block.offset as usize;
    let bytes = &payload[start..start + block.byte_len()];
    bytes
        .chunks_exact(block.format.element_size())
        .map(pod_read_unaligned::<T>)
        .collect()
}

fn write(tree: &PkdTree, options: WriteOptions) -> (Header, Vec<u8>, Vec<u8>) {
    let mut header = vec![];
    let mut payload = StreamSink::new(Cursor::new(Vec::<u8>::new()));
    let written = PkdWriter::with_options(options)
        .write(tree, &mut header, &mut payload)
        .unwrap();
    (written, header, payload.into_inner().into_inner())
}

#[test]
fn uncompressed_positions() {
    let tree = four_point_tree();
    let (header, xml, payload) = write(&tree, WriteOptions::default());

    assert_eq!(header.blocks.len(), 1);
    let block = header.positions().unwrap();
    assert_eq!(block.kind, BlockKind::Position);
    assert_eq!(block.offset, 0);
    assert_eq!(block.count, 4);
    assert_eq!(block.format, Format::Vec3f);
    assert_eq!(payload.len(), 48);

    let positions: Vec<Point3> = read_block(&payload, block);
    assert_eq!(positions, tree.particles().positions);

    let xml = String::from_utf8(xml).unwrap();
    assert!(xml.contains("<position ofs=\"0\" count=\"4\" format=\"vec3f\"/>"));
    assert!(xml.contains("<useOldAlphaSpheresCode value=\"0\"/>"));
    assert!(!xml.contains("<radius>"));
}

#[test]
fn attributes_and_types_follow_positions() {
    let tree = attributed_tree();
    let (header, xml, payload) = write(&tree, WriteOptions::default());
    let particles = tree.particles();

    let names: Vec<Option<&str>> = header.blocks.iter().map(|b| b.name.as_deref()).collect();
    assert_eq!(
        names,
        vec![None, Some("temperature"), Some("id"), Some("atomType")]
    );

    let mut expected_offset = 0;
    for block in header.blocks.iter() {
        assert_eq!(block.offset, expected_offset);
        assert_eq!(block.count, 20);
        expected_offset += block.byte_len() as u64;
    }
    assert_eq!(payload.len() as u64, expected_offset);

    let temperature: Vec<f32> = read_block(&payload, header.attribute("temperature").unwrap());
    assert_eq!(temperature, particles.attribute("temperature").unwrap().values());

    let types: Vec<f32> = read_block(&payload, header.attribute("atomType").unwrap());
    let expected: Vec<f32> = particles.types.iter().map(|&t| t as f32).collect();
    assert_eq!(types, expected);

    // the written order is the tree order: ids still match positions
    let positions: Vec<Point3> = read_block(&payload, header.positions().unwrap());
    let ids: Vec<f32> = read_block(&payload, header.attribute("id").unwrap());
    for (p, id) in positions.iter().zip(ids) {
        assert_eq!(split_key(p, Axis::X), id);
    }

    assert_eq!(header.radius, Some(0.25));
    let xml = String::from_utf8(xml).unwrap();
    assert!(xml.contains("<radius>0.250000</radius>"));
    assert!(xml.contains("<attribute name=\"atomType\" ofs=\"400\" count=\"20\" format=\"float\"/>"));
}

#[test]
fn quantized_positions() {
    let tree = attributed_tree();
    let options = WriteOptions::default().with_quantize(true);
    let (header, xml, payload) = write(&tree, options);

    let block = header.positions().unwrap();
    assert_eq!(block.format, Format::Uint64);
    assert_eq!(block.count, 20);
    assert_eq!(header.blocks[1].offset, 160);

    let bounds = header.quantization_bounds().unwrap();
    assert_eq!(bounds, tree.bounds());

    let packed: Vec<u64> = read_block(&payload, block);
    for (node, &q) in packed.iter().enumerate() {
        let (p, axis_bits) = quantize::decode(q, &bounds);
        let expected_bits = tree.axis(node).map_or(0, |axis| axis as u32);
        assert_eq!(axis_bits, expected_bits);

        let original = tree.position(node);
        for axis in Axis::ALL {
            let tolerance = bounds.extent(axis) / (1 << quantize::QUANTIZE_BITS) as f32 + 1e-5;
            let diff = (p.get(axis) - split_key(original, axis)).abs();
            assert!(diff <= tolerance, "node {} axis {}: off by {}", node, axis, diff);
        }
    }

    let xml = String::from_utf8(xml).unwrap();
    assert!(xml.contains("format=\"uint64\""));
    assert!(xml.contains("<bounds lower="));
}

#[test]
fn xml_header_lines() {
    let header = Header {
        blocks: vec![
            Block {
                kind: BlockKind::Position,
                name: None,
                offset: 0,
                count: 2,
                format: Format::Uint64,
            },
            Block {
                kind: BlockKind::Attribute,
                name: Some("a<b & \"c\"".to_string()),
                offset: 16,
                count: 2,
                format: Format::Float,
            },
        ],
        radius: Some(1.5),
        bounds: Some([[0., -1., 2.], [4., 1., 2.5]]),
        use_old_alpha_spheres_code: false,
    };

    assert_eq!(
        header.to_xml(),
        "<?xml version=\"1.0\"?>\n\
         <OSPRay>\n\
         <PKDGeometry>\n\
         <position ofs=\"0\" count=\"2\" format=\"uint64\"/>\n\
         <attribute name=\"a&lt;b &amp; &quot;c&quot;\" ofs=\"16\" count=\"2\" format=\"float\"/>\n\
         <bounds lower=\"0 -1 2\" upper=\"4 1 2.5\"/>\n\
         <radius>1.500000</radius>\n\
         <useOldAlphaSpheresCode value=\"0\"/>\n\
         </PKDGeometry>\n\
         </OSPRay>\n"
    );
}

#[test]
fn json_header_roundtrip() {
    let tree = attributed_tree();
    let options = WriteOptions::default().with_header_format(HeaderFormat::Json);
    let (header, json, _) = write(&tree, options);

    let parsed: Header = serde_json::from_slice(&json).unwrap();
    assert_eq!(parsed, header);
    let text = String::from_utf8(json).unwrap();
    assert!(text.contains("\"format\": \"vec3f\""));
    assert!(!text.contains("\"bounds\""));
}

#[test]
fn shared_sink_keeps_concurrent_blocks_apart() {
    let first = attributed_tree();
    let second = four_point_tree();
    let sink = SharedSink::new(Cursor::new(Vec::<u8>::new()));

    let (first_header, second_header) = std::thread::scope(|scope| {
        let a = scope.spawn(|| {
            PkdWriter::new()
                .write_payload(&first, &mut &sink)
                .unwrap()
        });
        let b = scope.spawn(|| {
            PkdWriter::new()
                .write_payload(&second, &mut &sink)
                .unwrap()
        });
        (a.join().unwrap(), b.join().unwrap())
    });
    let payload = sink.into_inner().unwrap().into_inner();

    let positions: Vec<Point3> = read_block(&payload, first_header.positions().unwrap());
    assert_eq!(positions, first.particles().positions);
    let ids: Vec<f32> = read_block(&payload, first_header.attribute("id").unwrap());
    assert_eq!(ids, first.particles().attribute("id").unwrap().values());

    let positions: Vec<Point3> = read_block(&payload, second_header.positions().unwrap());
    assert_eq!(positions, second.particles().positions);
}

/// Accepts `budget` bytes, then panics on the next write.
struct FailingWriter {
    inner: Cursor<Vec<u8>>,
    budget: usize,
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        assert!(self.inner.get_ref().len() + buf.len() <= self.budget, "disk full");
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Seek for FailingWriter {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[test]
fn shared_sink_reports_poisoned_lock() {
    let sink = SharedSink::new(FailingWriter {
        inner: Cursor::new(Vec::new()),
        budget: 4,
    });
    assert_eq!((&sink).append(&[1, 2, 3]).unwrap(), 0);

    let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = (&sink).append(&[4, 5]);
    }));
    assert!(panicked.is_err());

    let err = (&sink).append(&[6]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::Other);
    assert!(sink.into_inner().is_err());
}

#[test]
fn stream_sink_reports_offsets() {
    let mut sink = StreamSink::new(Cursor::new(Vec::<u8>::new()));
    assert_eq!(sink.append(&[1, 2, 3]).unwrap(), 0);
    assert_eq!(sink.append(&[4]).unwrap(), 3);
    assert_eq!(sink.get_ref().get_ref(), &vec![1, 2, 3, 4]);
}

#[test]
fn save_writes_header_and_payload_files() {
    let tree = attributed_tree();
    let dir = std::env::temp_dir().join(format!("particle-kd-save-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("tree.osp");

    let header = PkdWriter::new().save(&tree, &path).unwrap();
    assert_eq!(payload_path(&path), dir.join("tree.ospbin"));

    let xml = String::from_utf8(read(&path).unwrap()).unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\"?>\n<OSPRay>\n<PKDGeometry>\n"));
    assert!(xml.ends_with("</PKDGeometry>\n</OSPRay>\n"));

    let payload = read(payload_path(&path)).unwrap();
    let positions: Vec<Point3> = read_block(&payload, header.positions().unwrap());
    assert_eq!(positions, tree.particles().positions);

    std::fs::remove_dir_all(&dir).unwrap();
}
