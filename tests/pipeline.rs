use std::thread;
use std::time::Duration;

use streamwalk::memory::SysinfoProbe;
use streamwalk::stream::generator::GaussianSource;
use streamwalk::{ParameterName, Parameters, Pipeline, PipelineConfig, Trigger};

fn config(capacity: usize, window_len: usize) -> PipelineConfig {
    PipelineConfig {
        channel_capacity: capacity,
        window_len,
        tick_interval: Duration::from_millis(1),
        memory_sample_interval: Duration::from_millis(20),
        ..Default::default()
    }
}

#[test]
fn three_samples_through_a_window_of_three() {
    let pipeline = Pipeline::with_parts(
        config(2, 3),
        Box::new(vec![1.0, -2.0, 0.5].into_iter()),
        Box::new(SysinfoProbe::new().unwrap()),
    )
    .unwrap();
    assert_eq!(pipeline.parameters(), Parameters::default());
    assert_eq!(pipeline.window().values, vec![0.0]);

    assert_eq!(pipeline.step_aggregate().values, vec![0.0, 1.0]);
    assert_eq!(pipeline.step_aggregate().values, vec![0.0, 1.0, -1.0]);
    let last = pipeline.on_sample_available();
    assert_eq!(last.values, vec![1.0, -1.0, -0.5]);
    assert_eq!(last.appends, 3);

    // source is exhausted: further steps must not block or mutate
    assert_eq!(pipeline.step_aggregate(), last);
    assert_eq!(pipeline.try_step_aggregate(), last);

    let stats = pipeline.stats();
    assert_eq!(stats.produced, 3);
    assert_eq!(stats.consumed, 3);
    assert_eq!(stats.pending, 0);
}

#[test]
fn no_samples_emitted_after_stop_settles() {
    let pipeline = Pipeline::with_parts(
        config(2, 20),
        Box::new(GaussianSource::new(Some(42))),
        Box::new(SysinfoProbe::new().unwrap()),
    )
    .unwrap();

    for _ in 0..5 {
        pipeline.step_aggregate();
    }
    pipeline.request_stop();
    let at_stop = pipeline.stats().produced;

    thread::sleep(Duration::from_millis(50));
    let settled = pipeline.stats().produced;
    assert!(settled <= at_stop + 1);

    thread::sleep(Duration::from_millis(50));
    assert_eq!(pipeline.stats().produced, settled);

    pipeline.shutdown();
    assert!(pipeline.window().len() <= 20);
}

#[test]
fn seeded_pipelines_produce_identical_walks() {
    let walk = |seed| {
        let pipeline = Pipeline::with_parts(
            PipelineConfig {
                seed: Some(seed),
                ..config(2, 8)
            },
            Box::new(GaussianSource::new(Some(seed))),
            Box::new(SysinfoProbe::new().unwrap()),
        )
        .unwrap();
        pipeline.set_parameter(ParameterName::Variance, 10.0).unwrap();
        for _ in 0..12 {
            pipeline.step_aggregate();
        }
        pipeline.window()
    };

    let a = walk(7);
    let b = walk(7);
    assert_eq!(a, b);
    assert_eq!(a.len(), 8);
    assert_eq!(a.appends, 12);
}

#[test]
fn memory_window_is_bounded() {
    let pipeline = Pipeline::start(PipelineConfig {
        memory_window_len: 3,
        ..config(2, 20)
    })
    .unwrap();

    for _ in 0..10 {
        let snapshot = pipeline.on_timer_tick();
        assert!(snapshot.len() <= 3);
    }
    let memory = pipeline.memory_window();
    assert_eq!(memory.len(), 3);
    assert!(memory.values.iter().all(|mb| *mb > 0.0));
}
