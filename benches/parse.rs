use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pdf_core::byte_view::ByteView;
use pdf_core::document::Document;
use pdf_core::parser::parse_object;
use pdf_core::tokenizer::Tokenizer;

fn sample_document(object_count: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::new();
    for i in 1..=object_count {
        offsets.push(buf.len());
        buf.extend_from_slice(format!("{i} 0 obj\n<< /Index {i} /Data (payload for object {i}) >>\nendobj\n").as_bytes());
    }
    let xref_offset = buf.len();
    buf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", object_count + 1).as_bytes());
    for offset in &offsets {
        buf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    buf.extend_from_slice(format!("trailer\n<< /Size {} /Root 1 0 R >>\n", object_count + 1).as_bytes());
    buf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF").as_bytes());
    buf
}

fn bench_tokenize(c: &mut Criterion) {
    let bytes = sample_document(500);
    c.bench_function("tokenize 500-object document", |b| {
        b.iter(|| {
            let mut tk = Tokenizer::new(ByteView::new(bytes.clone()));
            let mut count = 0;
            while !tk.is_end() {
                black_box(tk.next());
                count += 1;
            }
            count
        })
    });
}

fn bench_parse_object(c: &mut Criterion) {
    let dict = b"<< /Type /Page /MediaBox [0 0 612 792] /Resources << /Font << /F1 5 0 R >> >> >>".to_vec();
    c.bench_function("parse a typical page dictionary", |b| {
        b.iter(|| {
            let mut tk = Tokenizer::new(ByteView::new(dict.clone()));
            black_box(parse_object(&mut tk).unwrap())
        })
    });
}

fn bench_load_document(c: &mut Criterion) {
    let bytes = sample_document(500);
    c.bench_function("load and resolve every object in a 500-object document", |b| {
        b.iter(|| {
            let doc = Document::from_bytes(bytes.clone()).unwrap();
            for i in 1..=500u32 {
                black_box(doc.get_object((i, 0)).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_tokenize, bench_parse_object, bench_load_document);
criterion_main!(benches);
