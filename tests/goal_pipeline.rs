use std::io::Write;
use std::path::Path;

use anyhow::Result;
use tempfile::NamedTempFile;

use goal_highlights::{
    BoundingBox, ClipExtractor, ClipRequest, Detection, DirectoryUploader, GoalDetector,
    HighlightConfig, HighlightPipeline, ObjectClass, ReplayBackend, StubBackend,
};

/// Writes a placeholder file instead of encoding video.
struct TouchExtractor;

impl ClipExtractor for TouchExtractor {
    fn extract(&self, request: &ClipRequest, output: &Path) -> Result<()> {
        let body = format!("{:.2}-{:.2}", request.start, request.end);
        std::fs::write(output, body)?;
        Ok(())
    }
}

fn synthetic_detector(seconds: f64, fps: f64, goals: &[f64]) -> GoalDetector {
    let frames = (seconds * fps).round() as usize;
    GoalDetector::new(
        HighlightConfig::default(),
        Box::new(StubBackend::synthetic_match(fps, frames, 640, 360, goals)),
    )
}

#[test]
fn detects_cuts_and_uploads_every_goal() -> Result<()> {
    let out = tempfile::tempdir()?;
    let bucket = tempfile::tempdir()?;
    let uploader = DirectoryUploader::new(bucket.path())?;

    let mut pipeline = HighlightPipeline::new(
        synthetic_detector(180.0, 10.0, &[25.0, 70.0, 150.0]),
        Box::new(TouchExtractor),
        Some(Box::new(uploader)),
    );
    let result = pipeline.process_video("stub://derby?seconds=180&fps=10", out.path());

    assert!(result.success);
    assert_eq!(result.goal_timestamps.len(), 3);
    for (found, expected) in result.goal_timestamps.iter().zip([25.0, 70.0, 150.0]) {
        assert!((found - expected).abs() < 1.0, "goal at {} vs {}", found, expected);
    }
    for pair in result.goal_timestamps.windows(2) {
        assert!(pair[1] - pair[0] >= 20.0);
    }

    let names: Vec<String> = result
        .highlight_clips
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "goal_highlight_00_1.mp4",
            "goal_highlight_01_2.mp4",
            "goal_highlight_02_3.mp4",
        ]
    );
    assert_eq!(result.uploaded_files, names);
    for name in &names {
        assert!(bucket.path().join(name).is_file());
    }
    Ok(())
}

#[test]
fn no_goals_means_no_clips_and_failure() {
    let out = tempfile::tempdir().unwrap();
    let mut pipeline = HighlightPipeline::new(
        synthetic_detector(90.0, 10.0, &[]),
        Box::new(TouchExtractor),
        None,
    );
    let result = pipeline.process_video("stub://quiet?seconds=90&fps=10", out.path());
    assert!(!result.success);
    assert!(result.goal_timestamps.is_empty());
    assert!(result.highlight_clips.is_empty());
}

#[test]
fn without_uploader_clips_alone_mean_success() {
    let out = tempfile::tempdir().unwrap();
    let mut pipeline = HighlightPipeline::new(
        synthetic_detector(60.0, 10.0, &[40.0]),
        Box::new(TouchExtractor),
        None,
    );
    let result = pipeline.process_video("stub://friendly?seconds=60&fps=10", out.path());
    assert!(result.success);
    assert_eq!(result.highlight_clips.len(), 1);
    assert!(result.uploaded_files.is_empty());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["goal_timestamps"].as_array().map(Vec::len), Some(1));
}

#[test]
fn replayed_detections_drive_the_same_session() -> Result<()> {
    let ball = |x: f32| {
        Detection::new(
            ObjectClass::Ball,
            0.9,
            BoundingBox::new(x - 5.0, 175.0, x + 5.0, 185.0),
        )
    };
    let mut file = NamedTempFile::new()?;
    for index in 0..600 {
        let frame = if (195..=205).contains(&index) {
            vec![ball(64.0)]
        } else {
            vec![ball(320.0)]
        };
        writeln!(file, "{}", serde_json::to_string(&frame)?)?;
    }
    file.flush()?;

    let mut detector = GoalDetector::new(
        HighlightConfig::default(),
        Box::new(ReplayBackend::open(file.path())?),
    );
    let analysis = detector.process_video("stub://replayed?seconds=60&fps=10")?;
    assert_eq!(analysis.frames_processed, 600);
    assert_eq!(analysis.goal_timestamps, vec![20.0]);
    Ok(())
}
