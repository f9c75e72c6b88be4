use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::scenes::Scene;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Edl,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Edl => "edl",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Json => "JSON",
            ExportFormat::Csv => "CSV",
            ExportFormat::Edl => "EDL",
        }
    }
}

/// Write `scenes` to `output_path`. Returns the number of scenes written.
pub fn export_scenes(scenes: &[Scene], output_path: &Path, format: ExportFormat, fps: f64) -> Result<usize> {
    match format {
        ExportFormat::Json => export_json(scenes, output_path)?,
        ExportFormat::Csv => export_csv(scenes, output_path, fps)?,
        ExportFormat::Edl => export_edl(scenes, output_path, fps)?,
    }

    tracing::info!(
        path = %output_path.display(),
        format = format.name(),
        scenes = scenes.len(),
        "Exported scenes"
    );
    Ok(scenes.len())
}

fn export_json(scenes: &[Scene], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(scenes)?;
    let mut file = File::create(output_path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

fn export_csv(scenes: &[Scene], output_path: &Path, fps: f64) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record([
        "sceneId",
        "fileId",
        "start",
        "length",
        "end",
        "startTimecode",
        "endTimecode",
        "color",
    ])?;

    for scene in scenes {
        let [r, g, b] = scene.color_array;
        wtr.write_record([
            scene.scene_id.as_str(),
            scene.file_id.as_str(),
            &scene.start.to_string(),
            &scene.length.to_string(),
            &scene.end().to_string(),
            &frames_to_timecode(scene.start, fps),
            &frames_to_timecode(scene.end(), fps),
            &format!("#{:02x}{:02x}{:02x}", r, g, b),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn export_edl(scenes: &[Scene], output_path: &Path, fps: f64) -> Result<()> {
    let mut file = File::create(output_path)?;
    for line in edl_lines(scenes, fps) {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

/// One CMX3600-style event per scene, alternating between tracks 000 and 001.
///
/// Source and record timecodes are the same.
pub fn edl_lines(scenes: &[Scene], fps: f64) -> Vec<String> {
    scenes
        .iter()
        .enumerate()
        .map(|(index, scene)| {
            let start = frames_to_timecode(scene.start, fps);
            let end = frames_to_timecode(scene.end(), fps);
            format!(
                "{:03}  {:03}       V     C        {} {} {} {}",
                index + 1,
                index % 2,
                start,
                end,
                start,
                end
            )
        })
        .collect()
}

/// `HH:MM:SS:FF` for a frame count. Fields below 10 are zero-padded.
pub fn frames_to_timecode(frames: u32, fps: f64) -> String {
    let frames = f64::from(frames);
    let seconds = frames / fps;
    format!(
        "{:02}:{:02}:{:02}:{:02}",
        (seconds / 3600.0).floor() as u64,
        ((seconds % 3600.0) / 60.0).floor() as u64,
        (seconds % 60.0).floor() as u64,
        (frames % fps).floor() as u64
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scene(index: usize, start: u32, length: u32) -> Scene {
        Scene {
            scene_id: format!("movie-{}", index),
            file_id: "movie".to_string(),
            start,
            length,
            color_array: [255, 16, 0],
        }
    }

    #[test]
    fn test_frames_to_timecode() {
        assert_eq!(frames_to_timecode(0, 25.0), "00:00:00:00");
        assert_eq!(frames_to_timecode(24, 25.0), "00:00:00:24");
        assert_eq!(frames_to_timecode(25 * 61 + 3, 25.0), "00:01:01:03");
        assert_eq!(frames_to_timecode(25 * 3600 * 2, 25.0), "02:00:00:00");
    }

    #[test]
    fn test_fractional_fps_floors_frames() {
        // 30 / 29.97 = 1.001 s, 30 % 29.97 = 0.03
        assert_eq!(frames_to_timecode(30, 29.97), "00:00:01:00");
    }

    #[test]
    fn test_edl_lines() {
        let scenes = vec![scene(0, 0, 50), scene(1, 50, 30)];
        let lines = edl_lines(&scenes, 25.0);

        assert_eq!(
            lines,
            vec![
                "001  000       V     C        00:00:00:00 00:00:02:00 00:00:00:00 00:00:02:00",
                "002  001       V     C        00:00:02:00 00:00:03:05 00:00:02:00 00:00:03:05",
            ]
        );
    }

    #[test]
    fn test_export_formats() {
        let dir = TempDir::new().unwrap();
        let scenes = vec![scene(0, 0, 10), scene(1, 10, 15)];

        for format in [ExportFormat::Json, ExportFormat::Csv, ExportFormat::Edl] {
            let path = dir.path().join(format!("scenes.{}", format.extension()));
            assert_eq!(export_scenes(&scenes, &path, format, 25.0).unwrap(), 2);
            assert!(path.exists());
        }

        let json = std::fs::read_to_string(dir.path().join("scenes.json")).unwrap();
        let back: Vec<Scene> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scenes);

        let csv = std::fs::read_to_string(dir.path().join("scenes.csv")).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("sceneId,fileId,start"));
        assert_eq!(
            lines.next().unwrap(),
            "movie-0,movie,0,10,10,00:00:00:00,00:00:00:10,#ff1000"
        );

        let edl = std::fs::read_to_string(dir.path().join("scenes.edl")).unwrap();
        assert_eq!(edl.lines().count(), 2);
    }
}
