// src/media/video.rs - FFmpeg argument builders and runner for scene clips
use crate::error::StepError;
use std::path::Path;
use std::process::Command;

pub const FPS: u32 = 24;
pub const CAPTION_FONT_SIZE: u32 = 40;
pub const CAPTION_BOTTOM_MARGIN: u32 = 60;

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn seconds(value: f64) -> String {
    format!("{:.3}", value.max(0.0))
}

/// Escape a path for use inside a filtergraph option value.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

/// Greedy word wrap. Words longer than `max_chars` get a line to themselves.
pub fn wrap_caption(text: &str, max_chars: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

/// Characters per caption line so text spans about 80% of the frame.
pub fn caption_line_chars(frame_width: u32) -> usize {
    let glyph_width = (CAPTION_FONT_SIZE / 2).max(1);
    ((frame_width as f64 * 0.8) / glyph_width as f64).floor().max(8.0) as usize
}

/// Hold a still image for `duration` seconds.
pub fn static_video_args(image: &Path, duration: f64, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-loop".into(),
        "1".into(),
        "-i".into(),
        path_arg(image),
        "-t".into(),
        seconds(duration),
        "-r".into(),
        FPS.to_string(),
        "-vf".into(),
        "scale=trunc(iw/2)*2:trunc(ih/2)*2".into(),
        "-c:v".into(),
        "libx264".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-an".into(),
        path_arg(output),
    ]
}

/// First `duration` seconds of `input`. A short source is padded by holding
/// its last frame.
pub fn clip_video_args(input: &Path, duration: f64, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        path_arg(input),
        "-vf".into(),
        format!("tpad=stop_mode=clone:stop_duration={}", seconds(duration)),
        "-t".into(),
        seconds(duration),
        "-c:v".into(),
        "libx264".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-an".into(),
        path_arg(output),
    ]
}

/// Scale into the frame and burn in a caption read from `caption_file`.
pub fn caption_clip_args(
    input: &Path,
    caption_file: &Path,
    frame: (u32, u32),
    output: &Path,
) -> Vec<String> {
    let (w, h) = frame;
    let filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,fps={fps},\
drawtext=textfile='{file}':fontsize={size}:fontcolor=white:box=1:boxcolor=black:boxborderw=8:\
line_spacing=6:x=(w-text_w)/2:y=h-text_h-{margin}",
        w = w,
        h = h,
        fps = FPS,
        file = escape_filter_path(caption_file),
        size = CAPTION_FONT_SIZE,
        margin = CAPTION_BOTTOM_MARGIN,
    );
    vec![
        "-y".into(),
        "-i".into(),
        path_arg(input),
        "-vf".into(),
        filter,
        "-c:v".into(),
        "libx264".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-an".into(),
        path_arg(output),
    ]
}

/// Concat demuxer list, one `file` line per clip.
pub fn concat_list(clips: &[impl AsRef<Path>]) -> String {
    clips
        .iter()
        .map(|clip| {
            format!(
                "file '{}'\n",
                clip.as_ref().to_string_lossy().replace('\'', "'\\''")
            )
        })
        .collect()
}

/// Concatenate the clips listed in `list_file` and lay the narration over them.
pub fn concat_with_audio_args(list_file: &Path, audio: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        path_arg(list_file),
        "-i".into(),
        path_arg(audio),
        "-map".into(),
        "0:v".into(),
        "-map".into(),
        "1:a".into(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        "aac".into(),
        "-shortest".into(),
        path_arg(output),
    ]
}

/// Run ffmpeg to completion. Blocking; call from a worker thread.
pub fn run_ffmpeg(ffmpeg: &str, args: &[String]) -> Result<(), StepError> {
    tracing::debug!("Executing FFmpeg: {} {}", ffmpeg, args.join(" "));
    let output = Command::new(ffmpeg)
        .args(args)
        .output()
        .map_err(|e| StepError::permanent("ffmpeg", format!("Failed to execute FFmpeg: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        return Err(StepError::transient("ffmpeg", format!("FFmpeg error: {}", tail)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_wrap_caption_respects_width() {
        let wrapped = wrap_caption("one two three four five six", 9);
        assert_eq!(wrapped, "one two\nthree\nfour five\nsix");
        assert_eq!(wrap_caption("", 10), "");
    }

    #[test]
    fn test_caption_line_chars_for_portrait_frame() {
        assert_eq!(caption_line_chars(720), 28);
    }

    #[test]
    fn test_static_video_holds_image_for_duration() {
        let args = static_video_args(Path::new("a.png"), 3.5, Path::new("out.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains("-loop 1 -i a.png -t 3.500 -r 24"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_clip_pads_then_trims() {
        let joined = clip_video_args(Path::new("in.mp4"), 2.0, Path::new("out.mp4")).join(" ");
        assert!(joined.contains("tpad=stop_mode=clone:stop_duration=2.000"));
        assert!(joined.contains("-t 2.000"));
    }

    #[test]
    fn test_caption_filter_uses_escaped_textfile() {
        let args = caption_clip_args(
            Path::new("in.mp4"),
            Path::new("C:/work/caption.txt"),
            (720, 1280),
            Path::new("out.mp4"),
        );
        let filter = &args[4];
        assert!(filter.contains("textfile='C\\:/work/caption.txt'"));
        assert!(filter.contains("fontsize=40"));
        assert!(filter.contains("y=h-text_h-60"));
        assert!(filter.starts_with("scale=720:1280"));
    }

    #[test]
    fn test_concat_list_quotes_paths() {
        let list = concat_list(&[PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/it's.mp4")]);
        assert_eq!(list, "file '/tmp/a.mp4'\nfile '/tmp/it'\\''s.mp4'\n");
    }
}
