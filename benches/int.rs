use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use tsch_int::int::{
    BudgetEngine, CarrierLoad, FrameKind, IntConfig, IntEngine, PacketBuf, SimEnvironment,
    TrafficOrigin,
};

const LINK_HEADER: usize = 21;

fn bench_budget(c: &mut Criterion) {
    let mut group = c.benchmark_group("int");

    let engine = BudgetEngine::new(&IntConfig::default());
    group.bench_function("budget_evaluate", |b| {
        b.iter(|| {
            for frame_len in 0..128 {
                black_box(engine.evaluate(
                    black_box(frame_len),
                    Some(CarrierLoad {
                        records: 3,
                        overflowed: false,
                    }),
                ));
            }
        });
    });

    group.finish();
}

fn bench_embed(c: &mut Criterion) {
    let mut group = c.benchmark_group("int");

    let mut originator = IntEngine::new(IntConfig::default(), SimEnvironment::new(7, 1))
        .expect("default config is valid");
    group.bench_function("prepare_outgoing_originator", |b| {
        b.iter_batched(
            || PacketBuf::outgoing(FrameKind::Data, vec![0u8; LINK_HEADER], &[0x11; 40]),
            |mut frame| black_box(originator.prepare_outgoing(&mut frame, TrafficOrigin::Originator)),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_relay(c: &mut Criterion) {
    let mut group = c.benchmark_group("int");

    let mut source = IntEngine::new(IntConfig::default(), SimEnvironment::new(2, 1))
        .expect("default config is valid");
    let mut sent = PacketBuf::outgoing(FrameKind::Data, vec![0u8; LINK_HEADER], &[0x11; 40]);
    source.prepare_outgoing(&mut sent, TrafficOrigin::Originator);
    let received = sent.into_received();

    let mut relay = IntEngine::new(IntConfig::default(), SimEnvironment::new(3, 1))
        .expect("default config is valid");
    group.bench_function("extract_and_forward", |b| {
        b.iter_batched(
            || received.clone(),
            |mut frame| {
                relay.on_frame_received(&mut frame, false);
                let mut out = PacketBuf::outgoing(FrameKind::Data, vec![0u8; LINK_HEADER], &[0x11; 40]);
                relay.prepare_outgoing(&mut out, TrafficOrigin::Forwarder);
                while relay.next_telemetry().is_some() {}
                black_box(out)
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_budget, bench_embed, bench_relay);
criterion_main!(benches);
