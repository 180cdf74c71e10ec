//! Image file source
//!
//! Replays a single image or a directory of images (sorted by file name) as a
//! video stream, once or in a loop. Decoded frames are cached after first use.

use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::frame::CapturedFrame;
use super::{CaptureError, CaptureProperties, FrameSource};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

pub struct ImageSequenceSource {
    name: String,
    paths: Vec<PathBuf>,
    cache: Vec<Option<RgbImage>>,
    next: usize,
    looping: bool,
    props: CaptureProperties,
}

impl ImageSequenceSource {
    /// Open an image file or a directory containing images
    pub fn open(path: &Path, looping: bool) -> Result<Self, CaptureError> {
        let name = path.display().to_string();

        let paths = if path.is_dir() {
            let entries = std::fs::read_dir(path).map_err(|e| CaptureError::open(&name, e.to_string()))?;
            let mut paths: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_image_path(p))
                .collect();
            paths.sort();
            paths
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(CaptureError::open(&name, "no such file or directory"));
        };

        if paths.is_empty() {
            return Err(CaptureError::open(&name, "directory contains no images"));
        }

        // The first image defines the reported frame size
        let first = decode(&paths[0]).map_err(|e| CaptureError::open(&name, e.to_string()))?;
        let props = CaptureProperties {
            width: first.width(),
            height: first.height(),
            fps: 0,
        };

        let mut cache = vec![None; paths.len()];
        cache[0] = Some(first);

        Ok(Self {
            name,
            paths,
            cache,
            next: 0,
            looping,
            props,
        })
    }

    /// Number of images in the sequence
    pub fn len(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_resolution(&mut self, _width: u32, _height: u32) {
        // Files keep their native size
    }

    fn set_fps(&mut self, fps: u32) {
        self.props.fps = fps;
    }

    fn properties(&self) -> CaptureProperties {
        self.props
    }

    fn read(&mut self) -> Result<CapturedFrame, CaptureError> {
        if self.next == self.paths.len() {
            if !self.looping {
                return Err(CaptureError::EndOfStream);
            }
            self.next = 0;
        }
        let index = self.next;
        self.next += 1;

        if self.cache[index].is_none() {
            match decode(&self.paths[index]) {
                Ok(image) => self.cache[index] = Some(image),
                Err(e) => {
                    warn!("Failed to decode {:?}: {}", self.paths[index], e);
                    return Err(CaptureError::Read(e.to_string()));
                }
            }
        }

        match &self.cache[index] {
            Some(image) => Ok(CapturedFrame::new(image.clone())),
            None => Err(CaptureError::Read(format!("{:?} not decoded", self.paths[index]))),
        }
    }
}

/// Whether the path has a known image file extension
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn decode(path: &Path) -> image::ImageResult<RgbImage> {
    Ok(image::open(path)?.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    fn write_image(dir: &Path, name: &str, color: [u8; 3]) {
        let image = RgbImage::from_pixel(8, 4, Rgb(color));
        image.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_directory_replays_sorted_and_loops() {
        let dir = TempDir::new().unwrap();
        write_image(dir.path(), "b.png", [0, 255, 0]);
        write_image(dir.path(), "a.png", [255, 0, 0]);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), true).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.properties().width, 8);
        assert_eq!(source.properties().height, 4);

        let colors: Vec<Rgb<u8>> = (0..3)
            .map(|_| *source.read().unwrap().image.get_pixel(0, 0))
            .collect();
        assert_eq!(colors, vec![Rgb([255, 0, 0]), Rgb([0, 255, 0]), Rgb([255, 0, 0])]);
    }

    #[test]
    fn test_single_file() {
        let dir = TempDir::new().unwrap();
        write_image(dir.path(), "frame.png", [1, 2, 3]);

        let mut source = ImageSequenceSource::open(&dir.path().join("frame.png"), false).unwrap();
        assert_eq!(source.len(), 1);
        assert_eq!(source.read().unwrap().dimensions(), (8, 4));
        assert!(matches!(source.read(), Err(CaptureError::EndOfStream)));
        // Stays at the end
        assert!(matches!(source.read(), Err(CaptureError::EndOfStream)));
    }

    #[test]
    fn test_image_path_detection() {
        assert!(is_image_path(Path::new("frames/0001.PNG")));
        assert!(is_image_path(Path::new("shot.jpeg")));
        assert!(!is_image_path(Path::new("clip.mp4")));
        assert!(!is_image_path(Path::new("/dev/video0")));
    }

    #[test]
    fn test_empty_directory_fails_to_open() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ImageSequenceSource::open(dir.path(), true),
            Err(CaptureError::Open { .. })
        ));
    }

    #[test]
    fn test_undecodable_frame_is_transient() {
        let dir = TempDir::new().unwrap();
        write_image(dir.path(), "a.png", [9, 9, 9]);
        std::fs::write(dir.path().join("b.png"), b"not a png").unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), true).unwrap();
        assert!(source.read().is_ok());
        assert!(matches!(source.read(), Err(CaptureError::Read(_))));
        // The sequence continues past the broken file
        assert!(source.read().is_ok());
    }
}
