use crate::{
    lecture::LectureRecord,
    types::{Frame, Segment},
};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Format transcript segments with timestamps
pub fn format_transcript_with_timestamps(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|seg| format!("[{}] {}", format_timestamp(seg.start), seg.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_frame(frame: &Frame) -> String {
    let mut line = format!("[{}] {}", format_timestamp(frame.time), frame.text.trim());
    if let Some(image) = &frame.image {
        line.push_str(&format!(" ({})", image));
    }
    line
}

pub fn format_lecture_readable(record: &LectureRecord) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", record.title));
    if !record.description.trim().is_empty() {
        output.push_str(&format!("{}\n\n", record.description.trim()));
    }
    output.push_str(&format!(
        "**Status:** {} | **Updated:** {}\n\n",
        record.status,
        record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    if let Some(summary) = &record.summary.merged {
        output.push_str("## Summary\n\n");
        output.push_str(summary);
        output.push_str("\n\n");
    }

    if let Some(quiz) = &record.quiz.merged {
        output.push_str("## Quiz\n\n");
        for question in quiz {
            output.push_str(&format!("• {}\n", question));
        }
        output.push('\n');
    }

    if !record.frames.is_empty() {
        output.push_str("## Frames\n\n");
        for frame in &record.frames {
            output.push_str(&format!("{}\n", format_frame(frame)));
        }
        output.push('\n');
    }

    if !record.transcript.is_empty() {
        output.push_str("## Transcript\n\n");
        output.push_str(&format_transcript_with_timestamps(&record.transcript));
        output.push('\n');
    }

    output
}
