use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pdf_core::document::Document;
use pdf_core::object::Object;

fn sample_document(object_count: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::new();
    for i in 1..=object_count {
        offsets.push(buf.len());
        buf.extend_from_slice(format!("{i} 0 obj\n<< /Index {i} >>\nendobj\n").as_bytes());
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

fn bench_full_rewrite(c: &mut Criterion) {
    let bytes = sample_document(500);
    c.bench_function("full rewrite of a 500-object document", |b| {
        b.iter(|| {
            let doc = Document::from_bytes(bytes.clone()).unwrap();
            black_box(doc.save_bytes().unwrap())
        })
    });
}

fn bench_incremental_save(c: &mut Criterion) {
    let bytes = sample_document(500);
    c.bench_function("incremental save after mutating 10 objects", |b| {
        b.iter(|| {
            let mut doc = Document::from_bytes(bytes.clone()).unwrap();
            for i in 1..=10u32 {
                doc.mark_updated((i, 0), Object::Integer(i as i64));
            }
            black_box(doc.save_incremental_bytes().unwrap())
        })
    });
}

criterion_group!(benches, bench_full_rewrite, bench_incremental_save);
criterion_main!(benches);
