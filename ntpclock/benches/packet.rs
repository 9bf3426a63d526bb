use criterion::{Criterion, criterion_group, criterion_main};
use ntpclock::packet::{build_request, extract_transmit_epoch, validate};
use ntpclock::NtpPacket;
use std::hint::black_box;

fn server_response() -> NtpPacket {
    let mut raw = [0u8; 48];
    // LI 0, version 4, mode 4
    raw[0] = 0b0010_0100;
    raw[1] = 2;
    raw[16..20].copy_from_slice(&3_908_988_784u32.to_be_bytes());
    raw[40..44].copy_from_slice(&3_908_988_800u32.to_be_bytes());

    NtpPacket::from(raw)
}

fn criterion_benchmark(c: &mut Criterion) {
    let response = server_response();

    c.bench_function("build_request", |b| {
        b.iter(|| black_box(build_request()));
    });
    c.bench_function("validate_and_extract", |b| {
        b.iter(|| {
            let packet = black_box(&response);
            validate(packet).then(|| extract_transmit_epoch(packet))
        });
    });
}

criterion_group!(packet_benches, criterion_benchmark);
criterion_main!(packet_benches);
