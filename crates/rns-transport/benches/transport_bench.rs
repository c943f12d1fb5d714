use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rns_core::{DestinationHash, PacketHash, TruncatedHash};
use rns_transport::dedup::PacketHashlist;
use rns_transport::ifac::{self, IfacCredentials};
use rns_transport::path::{PathEntry, PathTable};
use rns_transport::InterfaceId;

fn packet_hash(seed: u32) -> PacketHash {
    let mut bytes = [0u8; 32];
    bytes[..4].copy_from_slice(&seed.to_be_bytes());
    PacketHash::new(bytes)
}

fn dest(seed: u32) -> DestinationHash {
    let mut bytes = [0u8; 16];
    bytes[..4].copy_from_slice(&seed.to_be_bytes());
    DestinationHash::new(bytes)
}

fn bench_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup");

    let mut list = PacketHashlist::new();
    for i in 0..100_000 {
        list.remember(packet_hash(i));
    }
    group.bench_function("should_process_hit", |b| {
        b.iter(|| list.should_process(&packet_hash(50_000)))
    });
    group.bench_function("should_process_miss", |b| {
        b.iter(|| list.should_process(&packet_hash(500_000)))
    });

    group.bench_function("remember_with_rotation", |b| {
        let mut small = PacketHashlist::with_max_size(1024);
        let mut seed = 0u32;
        b.iter(|| {
            seed = seed.wrapping_add(1);
            small.remember(packet_hash(seed));
        })
    });

    group.finish();
}

fn bench_path_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_table");
    let iface = InterfaceId::from_name("bench0");

    let table = PathTable::new();
    for i in 0..10_000 {
        table.insert(
            dest(i),
            PathEntry::new(0, TruncatedHash::new([1; 16]), 2, u64::MAX, iface, packet_hash(i)),
        );
    }

    group.bench_function("live_lookup", |b| b.iter(|| table.live(&dest(4_242), 1)));
    group.bench_function("next_hop_interface", |b| {
        b.iter(|| table.next_hop_interface(&dest(4_242), 1))
    });
    group.bench_function("mark_cycle", |b| {
        b.iter(|| {
            table.mark_unresponsive(&dest(7));
            table.mark_responsive(&dest(7));
        })
    });

    group.finish();
}

fn bench_ifac(c: &mut Criterion) {
    let mut group = c.benchmark_group("ifac");
    let creds = IfacCredentials::new(Some("benchnet"), Some("passphrase"), 16).unwrap();

    for size in [64usize, 500] {
        let mut frame = vec![0x00, 0x00];
        frame.resize(size, 0x5a);
        let masked = ifac::mask(&creds, &frame).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("mask", size), &frame, |b, f| {
            b.iter(|| ifac::mask(&creds, f).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("unmask", size), &masked, |b, m| {
            b.iter(|| ifac::unmask(&creds, m).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dedup, bench_path_table, bench_ifac);
criterion_main!(benches);
