use crate::timelapse_core::error::{Result, TimelapseError};
use image::RgbImage;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};

/// Consumer of timelapse frames.
///
/// Frames passed to `append` all have the dimensions given to `open`, in
/// playback order. `close` finalizes the file and returns its size in bytes.
/// `abort` discards everything written so far; after it returns nothing may
/// remain at the output path that was passed to `open`.
pub trait VideoSink {
    fn open(&mut self, width: u32, height: u32, frame_rate: u32, path: &Path) -> Result<()>;
    fn append(&mut self, frame: &RgbImage) -> Result<()>;
    fn close(&mut self) -> Result<u64>;
    fn abort(&mut self);
}

/// Encodes frames by piping raw RGB into an `ffmpeg` child process.
///
/// Output goes to a hidden `.partial` file next to the target and is only
/// renamed into place once ffmpeg exits cleanly.
pub struct FfmpegSink {
    program: String,
    codec: String,
    encoding: Option<Encoding>,
}

struct Encoding {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    partial_path: PathBuf,
    final_path: PathBuf,
    width: u32,
    height: u32,
}

impl FfmpegSink {
    pub fn new(codec: &str) -> Self {
        Self::with_program("ffmpeg", codec)
    }

    pub fn with_program(program: &str, codec: &str) -> Self {
        FfmpegSink {
            program: program.to_string(),
            codec: codec.to_string(),
            encoding: None,
        }
    }

    fn encoder_error(&self, context: &str, e: io::Error) -> TimelapseError {
        TimelapseError::Encoder(format!("{} ({}): {}", context, self.program, e))
    }
}

impl Default for FfmpegSink {
    fn default() -> Self {
        Self::new("mpeg4")
    }
}

/// `out/site.mp4` is written as `out/.site.mp4.partial` until finished.
pub fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    path.with_file_name(format!(".{}.partial", name))
}

impl VideoSink for FfmpegSink {
    fn open(&mut self, width: u32, height: u32, frame_rate: u32, path: &Path) -> Result<()> {
        if self.encoding.is_some() {
            return Err(TimelapseError::Encoder(
                "video sink is already open".to_string(),
            ));
        }

        let partial = partial_path(path);
        log::debug!(
            "Starting {} for {} ({}x{} @ {} fps, codec {})",
            self.program,
            path.display(),
            width,
            height,
            frame_rate,
            self.codec
        );

        let mut child = Command::new(&self.program)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{}x{}", width, height))
            .arg("-r")
            .arg(frame_rate.to_string())
            .args(["-i", "-", "-an"])
            // yuv420p needs even dimensions
            .args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"])
            .arg("-c:v")
            .arg(&self.codec)
            .args(["-pix_fmt", "yuv420p", "-f", "mp4"])
            .arg(&partial)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.encoder_error("failed to start encoder", e))?;

        let stdin = child.stdin.take();
        let stderr = child.stderr.take().map(drain_stderr);
        self.encoding = Some(Encoding {
            child,
            stdin,
            stderr,
            partial_path: partial,
            final_path: path.to_path_buf(),
            width,
            height,
        });

        Ok(())
    }

    fn append(&mut self, frame: &RgbImage) -> Result<()> {
        let encoding = self.encoding.as_mut().ok_or(TimelapseError::SinkNotOpen)?;

        if frame.dimensions() != (encoding.width, encoding.height) {
            return Err(TimelapseError::FrameSize {
                width: encoding.width,
                height: encoding.height,
                got_width: frame.width(),
                got_height: frame.height(),
            });
        }

        let stdin = encoding.stdin.as_mut().ok_or(TimelapseError::SinkNotOpen)?;
        if let Err(e) = stdin.write_all(frame.as_raw()) {
            return Err(self.encoder_error("failed to write frame", e));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<u64> {
        let mut encoding = self.encoding.take().ok_or(TimelapseError::SinkNotOpen)?;

        // Closing stdin signals end of stream.
        drop(encoding.stdin.take());
        let status = match encoding.child.wait() {
            Ok(status) => status,
            Err(e) => {
                let _ = fs::remove_file(&encoding.partial_path);
                return Err(self.encoder_error("failed to wait for encoder", e));
            }
        };
        let stderr = encoding.collect_stderr();

        if !status.success() {
            let _ = fs::remove_file(&encoding.partial_path);
            return Err(TimelapseError::Encoder(format!(
                "{} exited with {}: {}",
                self.program,
                status,
                stderr.trim()
            )));
        }
        if !stderr.trim().is_empty() {
            log::debug!("{} output: {}", self.program, stderr.trim());
        }

        fs::rename(&encoding.partial_path, &encoding.final_path)?;
        let size = fs::metadata(&encoding.final_path)?.len();
        log::info!(
            "File: {}, Size: {:.2} KB",
            encoding.final_path.display(),
            size as f64 / 1024.0
        );
        Ok(size)
    }

    fn abort(&mut self) {
        let Some(mut encoding) = self.encoding.take() else {
            return;
        };

        drop(encoding.stdin.take());
        if let Err(e) = encoding.child.kill() {
            log::debug!("Encoder already exited: {}", e);
        }
        let _ = encoding.child.wait();
        encoding.collect_stderr();

        match fs::remove_file(&encoding.partial_path) {
            Ok(()) => log::info!("Removed partial output {}", encoding.partial_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Failed to remove partial output {}: {}",
                encoding.partial_path.display(),
                e
            ),
        }
    }
}

impl Encoding {
    /// Wait for the stderr reader. Only call once the child has exited.
    fn collect_stderr(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default()
    }
}

/// Collect the encoder's stderr on a separate thread until the pipe closes.
fn drain_stderr(mut pipe: ChildStderr) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut bytes) {
            log::debug!("Stopped reading encoder output: {}", e);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Check if ffmpeg is available on the system.
pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use image::Rgb;

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/out/RC0307R_timelapse.mp4")),
            PathBuf::from("/out/.RC0307R_timelapse.mp4.partial")
        );
    }

    #[test]
    fn test_append_before_open() {
        let mut sink = FfmpegSink::default();
        let frame = RgbImage::new(4, 4);
        assert!(matches!(sink.append(&frame), Err(TimelapseError::SinkNotOpen)));
        assert!(matches!(sink.close(), Err(TimelapseError::SinkNotOpen)));
        sink.abort();
    }

    #[test]
    fn test_missing_encoder_program() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("site.mp4");
        let mut sink = FfmpegSink::with_program("sandlapse-no-such-encoder", "mpeg4");

        let err = sink.open(8, 8, 7, &out).unwrap_err();
        assert!(matches!(err, TimelapseError::Encoder(_)));
        assert!(!out.exists());
        assert!(!partial_path(&out).exists());
    }

    /// Stand-in encoder: prints `noise_bytes` to stderr before reading any
    /// frames, then writes "video" to its last argument and exits with `code`.
    #[cfg(unix)]
    fn fake_encoder(dir: &Path, noise_bytes: usize, code: i32) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-encoder.sh");
        fs::write(
            &script,
            format!(
                "#!/bin/sh\n\
                 head -c {noise_bytes} /dev/zero | tr '\\0' 'x' >&2\n\
                 echo 'codec exploded' >&2\n\
                 cat > /dev/null\n\
                 for last; do :; done\n\
                 printf video > \"$last\"\n\
                 exit {code}\n"
            ),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[test]
    fn test_verbose_encoder_does_not_block_frames() {
        let temp = TempDir::new().unwrap();
        let program = fake_encoder(temp.path(), 256 * 1024, 0);
        let out = temp.path().join("site.mp4");

        let mut sink = FfmpegSink::with_program(&program, "mpeg4");
        sink.open(64, 64, 7, &out).unwrap();
        // Well past the size of a pipe buffer in both directions.
        for _ in 0..32 {
            sink.append(&RgbImage::new(64, 64)).unwrap();
        }
        assert_eq!(sink.close().unwrap(), 5);
        assert_eq!(fs::read_to_string(&out).unwrap(), "video");
        assert!(!partial_path(&out).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_encoder_reports_stderr() {
        let temp = TempDir::new().unwrap();
        let program = fake_encoder(temp.path(), 16, 3);
        let out = temp.path().join("site.mp4");

        let mut sink = FfmpegSink::with_program(&program, "mpeg4");
        sink.open(8, 8, 7, &out).unwrap();
        sink.append(&RgbImage::new(8, 8)).unwrap();

        let err = sink.close().unwrap_err();
        assert!(matches!(&err, TimelapseError::Encoder(msg) if msg.contains("codec exploded")));
        assert!(!out.exists());
        assert!(!partial_path(&out).exists());
    }

    #[test]
    fn test_encode_and_abort_with_ffmpeg() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg not installed, skipping");
            return;
        }
        let temp = TempDir::new().unwrap();

        let out = temp.path().join("site.mp4");
        let mut sink = FfmpegSink::default();
        sink.open(33, 17, 7, &out).unwrap();
        for shade in [0u8, 128, 255] {
            sink.append(&RgbImage::from_pixel(33, 17, Rgb([shade, shade, shade])))
                .unwrap();
        }
        assert!(matches!(
            sink.append(&RgbImage::new(10, 10)),
            Err(TimelapseError::FrameSize { .. })
        ));
        let size = sink.close().unwrap();
        assert!(size > 0);
        assert!(out.exists());
        assert!(!partial_path(&out).exists());

        let aborted = temp.path().join("aborted.mp4");
        let mut sink = FfmpegSink::default();
        sink.open(16, 16, 7, &aborted).unwrap();
        sink.append(&RgbImage::new(16, 16)).unwrap();
        sink.abort();
        assert!(!aborted.exists());
        assert!(!partial_path(&aborted).exists());
    }
}
