use crate::model::{CandidateFile, SourceHandle};
use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;
use walkdir::WalkDir;

/// Every regular file under `root`, sorted by path. Unsupported files are
/// left in; `add_tracks` drops them.
pub fn scan_folder(root: &Path) -> Vec<CandidateFile> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| strip_verbatim_prefix(entry.path()))
        .collect();
    paths.sort();
    paths.into_iter().map(candidate_for_path).collect()
}

pub fn candidates_from_paths(paths: &[PathBuf]) -> Vec<CandidateFile> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            out.extend(scan_folder(path));
        } else {
            out.push(candidate_for_path(resolve_path(path)));
        }
    }
    out
}

/// Canonical form of a user-supplied path, or the path as given when it
/// cannot be resolved.
fn resolve_path(path: &Path) -> PathBuf {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    strip_verbatim_prefix(&canonical)
}

/// `canonicalize` on Windows returns `\\?\` paths that some decoders reject.
fn strip_verbatim_prefix(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    if let Some(share) = raw.strip_prefix(r"\\?\UNC\") {
        return PathBuf::from(format!(r"\\{share}"));
    }
    match raw.strip_prefix(r"\\?\") {
        Some(local) => PathBuf::from(local),
        None => path.to_path_buf(),
    }
}

fn candidate_for_path(path: PathBuf) -> CandidateFile {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    CandidateFile::new(name, SourceHandle::from_path(path))
}

pub fn probe_duration(path: &Path) -> Option<Duration> {
    let stripped = strip_verbatim_prefix(path);

    let Ok(file) = File::open(&stripped) else {
        return None;
    };
    let source = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(extension) = stripped.extension().and_then(OsStr::to_str) {
        hint.with_extension(extension);
    }

    let Ok(probed) = get_probe().format(
        &hint,
        source,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) else {
        return None;
    };

    probed
        .format
        .default_track()
        .and_then(|track| codec_duration(&track.codec_params))
}

fn codec_duration(codec_params: &symphonia::core::codecs::CodecParameters) -> Option<Duration> {
    if let (Some(time_base), Some(frame_count)) = (codec_params.time_base, codec_params.n_frames) {
        let time = time_base.calc_time(frame_count);
        return Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac));
    }

    codec_params
        .n_frames
        .zip(codec_params.sample_rate)
        .filter(|(_, sample_rate)| *sample_rate > 0)
        .map(|(frame_count, sample_rate)| {
            Duration::from_secs_f64(frame_count as f64 / f64::from(sample_rate))
        })
}
