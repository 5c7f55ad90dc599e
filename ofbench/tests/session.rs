mod common;

use common::*;
use ofbench::prelude::v1::*;
use ofbench::session::SessionReport;
use std::path::PathBuf;

const ALGORITHMS: [&str; 8] = [
    "DIS_Medium",
    "DIS_Fast",
    "DIS_UltraFast",
    "Farneback",
    "DenseRLOF",
    "DualTVL1",
    "PCAFlow",
    "DeepFlow",
];

fn batch(media: &mut SyntheticMedia, registry: &Registry) -> Result<SessionReport> {
    let invocation =
        Invocation::from_tokens(Some("videos/walk.avi"), Some("testAll"), 1).unwrap();
    Session::new(registry, Default::default()).execute(media, &invocation)
}

#[test]
fn batch_renders_every_algorithm() {
    let (registry, calls) = recording_registry(Behaviour::Succeed);
    let mut media = SyntheticMedia::new(10);

    let report = match batch(&mut media, &registry).unwrap() {
        SessionReport::Batch(report) => report,
        r => panic!("unexpected report {:?}", r),
    };

    assert_eq!(report.succeeded(), 8);
    assert_eq!(report.failed(), 0);

    let names: Vec<_> = report.entries.iter().map(|e| e.algorithm).collect();
    assert_eq!(names, ALGORITHMS);

    let log = media.log.borrow();
    assert_eq!(log.opened_sources.len(), 8);
    assert_eq!(log.released_sources, 8);
    assert_eq!(log.displays_opened, 0);

    for (entry, name) in report.entries.iter().zip(ALGORITHMS) {
        let output = PathBuf::from(format!("videos/walk_{name}.mp4"));
        assert_eq!(entry.output, output);

        let written = log.written_to(&output);
        assert_eq!(written.len(), 9);
        assert!(written
            .iter()
            .all(|(_, dim, _)| *dim == (2 * WIDTH as u32, HEIGHT as u32)));

        let summary = entry.result.as_ref().unwrap();
        assert_eq!(summary.algorithm, Some(name));
        assert_eq!(summary.composed, 9);
        assert!(!summary.cancelled);
    }

    for (path, format) in &log.opened_sinks {
        assert_eq!(format.frame_rate, 25.0);
        assert_eq!((format.width, format.height), (2 * WIDTH, HEIGHT));
        assert!(log.closed_sinks.contains(path));
    }

    // Every algorithm starts from the first frame of the source.
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 8 * 9);
    for (chunk, name) in calls.chunks(9).zip(ALGORITHMS) {
        assert!(chunk.iter().all(|c| c.algorithm == name));
    }
}

#[test]
fn batch_rejects_device() {
    let (registry, calls) = recording_registry(Behaviour::Succeed);
    let mut media = SyntheticMedia::new(10);

    let invocation = Invocation::from_tokens(Some("0"), Some("testAll"), 1).unwrap();
    let result = Session::new(&registry, Default::default()).execute(&mut media, &invocation);

    assert!(matches!(
        result,
        Err(Error::InvalidModeForSource { device: 0, .. })
    ));

    let log = media.log.borrow();
    assert!(log.opened_sources.is_empty());
    assert!(log.opened_sinks.is_empty());
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn batch_continues_after_failure() {
    let (registry, _) = recording_registry(Behaviour::Succeed);
    let mut media = SyntheticMedia::new(4);
    media.fail_sink = true;

    let report = match batch(&mut media, &registry).unwrap() {
        SessionReport::Batch(report) => report,
        r => panic!("unexpected report {:?}", r),
    };

    assert_eq!(report.entries.len(), 8);
    assert_eq!(report.failed(), 8);
    assert!(report
        .entries
        .iter()
        .all(|e| matches!(e.result, Err(Error::Backend(_)))));
    assert_eq!(media.log.borrow().released_sources, 8);
}

#[test]
fn batch_with_failing_estimators_still_writes() {
    let (registry, _) = recording_registry(Behaviour::Fail);
    let mut media = SyntheticMedia::new(5);

    let report = match batch(&mut media, &registry).unwrap() {
        SessionReport::Batch(report) => report,
        r => panic!("unexpected report {:?}", r),
    };

    assert_eq!(report.succeeded(), 8);
    for entry in &report.entries {
        let summary = entry.result.as_ref().unwrap();
        assert_eq!(summary.failures, 4);
        assert_eq!(media.log.borrow().written_to(&entry.output).len(), 4);
    }
}

#[test]
fn interactive_opens_and_closes_display() {
    let (registry, calls) = recording_registry(Behaviour::Succeed);
    let mut media = SyntheticMedia::new(6);

    let invocation = Invocation::from_tokens(Some("clip.avi"), Some("6"), 1).unwrap();
    let report = Session::new(&registry, Default::default())
        .execute(&mut media, &invocation)
        .unwrap();

    let summary = match report {
        SessionReport::Interactive(summary) => summary,
        r => panic!("unexpected report {:?}", r),
    };
    assert_eq!(summary.algorithm, Some("DualTVL1"));
    assert_eq!(summary.composed, 5);

    let log = media.log.borrow();
    assert_eq!(log.displays_opened, 1);
    assert_eq!(log.displays_closed, 1);
    assert_eq!(log.shown, 5);
    assert!(log.opened_sinks.is_empty());
    assert_eq!(calls.lock().unwrap().len(), 5);
}

#[test]
fn interactive_default_algorithm_from_device() {
    let (registry, _) = recording_registry(Behaviour::Succeed);
    let mut media = SyntheticMedia::new(3).press_at(2, ESC);

    let invocation = Invocation::from_tokens(None, None, 2).unwrap();
    let report = Session::new(&registry, Default::default())
        .execute(&mut media, &invocation)
        .unwrap();

    match report {
        SessionReport::Interactive(summary) => {
            assert_eq!(summary.algorithm, Some("DIS_Fast"));
            assert!(summary.cancelled);
            assert_eq!(summary.frames, 2);
        }
        r => panic!("unexpected report {:?}", r),
    }

    let log = media.log.borrow();
    assert_eq!(log.opened_sources, [SourceSpec::Device(0)]);
    assert_eq!(log.displays_closed, 1);
}

#[test]
fn interactive_unknown_algorithm_opens_nothing() {
    let (registry, _) = recording_registry(Behaviour::Succeed);
    let mut media = SyntheticMedia::new(3);

    for mode in ["0", "12"] {
        let invocation = Invocation::from_tokens(Some("clip.avi"), Some(mode), 1).unwrap();
        let result = Session::new(&registry, Default::default()).execute(&mut media, &invocation);
        assert!(matches!(result, Err(Error::UnknownAlgorithm(_))));
    }

    let log = media.log.borrow();
    assert_eq!(log.displays_opened, 0);
    assert!(log.opened_sources.is_empty());
}
