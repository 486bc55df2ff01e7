// ABOUTME: Benchmark suite for the SMPP session codec and message segmentation
// ABOUTME: Measures frame checking, decoding, encoding and GSM 7-bit / UCS-2 segmentation

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use smpp_session::datatypes::*;
use smpp_session::{Encodable, Frame, PduRegistry, Segmenter, TargetEncoding};
use std::time::Duration;

fn create_sample_submit_sm() -> SubmitSm {
    SubmitSm::new(1, "12345", "67890", Bytes::from_static(b"Hello World"))
        .dest_addr_ton(TypeOfNumber::International)
        .registered_delivery(SubmitSm::RECEIPT_REQUESTED)
}

fn create_sample_deliver_sm() -> DeliverSm {
    DeliverSm::new(
        1,
        "67890",
        "12345",
        Bytes::from_static(
            b"id:0123456789 sub:001 dlvrd:001 submit date:2401011200 done date:2401011201 stat:DELIVRD err:000 text:Hello World",
        ),
    )
    .esm_class(EsmClass::delivery_receipt())
}

fn create_sample_bind_transceiver() -> BindTransceiver {
    BindTransceiver::new(1, "test_system", "password")
}

fn frame_bytes(pdu: &impl Encodable) -> Bytes {
    pdu.to_bytes().unwrap()
}

fn bench_frame_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_check");
    group.measurement_time(Duration::from_secs(10));

    let submit_bytes = frame_bytes(&create_sample_submit_sm());
    group.bench_function("submit_sm", |b| {
        b.iter(|| Frame::check(black_box(&submit_bytes)))
    });

    let enquire_bytes = frame_bytes(&EnquireLink::new(1));
    group.bench_function("enquire_link", |b| {
        b.iter(|| Frame::check(black_box(&enquire_bytes)))
    });

    group.finish();
}

fn bench_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");
    group.measurement_time(Duration::from_secs(10));

    let registry = PduRegistry::new();
    let samples = [
        ("submit_sm", frame_bytes(&create_sample_submit_sm())),
        ("deliver_sm", frame_bytes(&create_sample_deliver_sm())),
        ("bind_transceiver", frame_bytes(&create_sample_bind_transceiver())),
        ("enquire_link", frame_bytes(&EnquireLink::new(1))),
    ];

    for (name, bytes) in &samples {
        group.bench_with_input(BenchmarkId::new("registry", name), bytes, |b, bytes| {
            b.iter(|| registry.decode_frame(black_box(bytes)).unwrap())
        });
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");
    group.measurement_time(Duration::from_secs(10));

    let submit_sm = create_sample_submit_sm();
    group.bench_function("submit_sm", |b| b.iter(|| black_box(&submit_sm).to_bytes()));

    let deliver_sm = create_sample_deliver_sm();
    group.bench_function("deliver_sm", |b| {
        b.iter(|| black_box(&deliver_sm).to_bytes())
    });

    let bind = create_sample_bind_transceiver();
    group.bench_function("bind_transceiver", |b| b.iter(|| black_box(&bind).to_bytes()));

    let enquire_link = EnquireLink::new(1);
    group.bench_function("enquire_link", |b| {
        b.iter(|| black_box(&enquire_link).to_bytes())
    });

    group.finish();
}

fn bench_receipt_parsing(c: &mut Criterion) {
    let deliver_sm = create_sample_deliver_sm();
    c.bench_function("receipt_message_id", |b| {
        b.iter(|| smpp_session::extract_message_id(black_box(&deliver_sm.short_message)))
    });
}

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");
    group.measurement_time(Duration::from_secs(10));

    let segmenter = Segmenter::new();
    // Single part, first concatenated size and a long multi-part text
    for &size in &[100, 161, 1000] {
        let gsm = "A".repeat(size);
        group.bench_with_input(BenchmarkId::new("gsm7", size), &gsm, |b, text| {
            b.iter(|| segmenter.segment(black_box(text), TargetEncoding::Auto).unwrap())
        });

        let ucs2 = "\u{4f60}".repeat(size);
        group.bench_with_input(BenchmarkId::new("ucs2", size), &ucs2, |b, text| {
            b.iter(|| segmenter.segment(black_box(text), TargetEncoding::Auto).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_check,
    bench_frame_decode,
    bench_serialization,
    bench_receipt_parsing,
    bench_segmentation
);
criterion_main!(benches);
