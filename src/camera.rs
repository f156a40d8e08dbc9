// Opens a camera and turns its frames into RGBA FrameBuffers.
// This is the frame source: one `next_frame()` per tick of the main loop.

use crate::error::{Error, Result};
use crate::types::FrameBuffer;

use nokhwa::{
    Camera,
    pixel_format::RgbAFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

// A small wrapper around nokhwa::Camera so our main loop stays clean.
pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
    mirror: bool, // flip left/right so the window behaves like a mirror
}

impl CameraCapture {
    /// Open camera `index` as close as possible to `width`x`height` @ `fps`.
    /// Nothing is shown yet; we just hold an open stream.
    pub fn new(index: u32, width: u32, height: u32, fps: u32, mirror: bool) -> Result<Self> {
        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::YUYV, // uncompressed; cheap to convert
            fps,
        );
        let req = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::Closest(fmt));

        // Fails when there is no such device or access is denied.
        let mut cam = Camera::new(CameraIndex::Index(index), req)
            .map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;

        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

        // The actual stream might choose a slightly different resolution.
        let actual = cam.resolution();
        log::info!(
            "camera {index}: {}x{} @ {} fps (asked for {width}x{height} @ {fps})",
            actual.width(),
            actual.height(),
            cam.frame_rate()
        );

        Ok(Self {
            cam,
            width: actual.width(),
            height: actual.height(),
            mirror,
        })
    }

    /// Grab one frame (blocks until the camera has one) as RGBA.
    pub fn next_frame(&mut self) -> Result<FrameBuffer> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

        let rgba = frame
            .decode_image::<RgbAFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGBA: {e}")))?;

        let (w, h) = rgba.dimensions();
        let mut fb = FrameBuffer::from_rgba(w as usize, h as usize, rgba.into_raw())?;
        if self.mirror {
            fb.mirror_horizontally();
        }
        Ok(fb)
    }

    /// Report the actual resolution the camera is delivering.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
