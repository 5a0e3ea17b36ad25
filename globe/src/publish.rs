//! Marker publishing towards the rendering side

use crate::driver::FrameInfo;
use crate::tracking::MarkerHandle;
use crate::units::Timestamp;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use tletypes::prelude::{Cartesian3, CatalogNumber};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerInfo {
    pub handle: MarkerHandle,
    pub name: String,
    pub catalog_number: Option<CatalogNumber>,
}

pub trait MarkerSink {
    fn add_markers(&mut self, markers: &[MarkerInfo]);

    fn move_marker(&mut self, handle: MarkerHandle, position: &Cartesian3);

    fn remove_markers(&mut self, handles: &[MarkerHandle]);

    /// Called after every marker of a frame has been moved
    fn end_frame(&mut self, _frame: &FrameInfo) {}
}

impl<S: MarkerSink + ?Sized> MarkerSink for Box<S> {
    fn add_markers(&mut self, markers: &[MarkerInfo]) {
        (**self).add_markers(markers)
    }

    fn move_marker(&mut self, handle: MarkerHandle, position: &Cartesian3) {
        (**self).move_marker(handle, position)
    }

    fn remove_markers(&mut self, handles: &[MarkerHandle]) {
        (**self).remove_markers(handles)
    }

    fn end_frame(&mut self, frame: &FrameInfo) {
        (**self).end_frame(frame)
    }
}

/// Keeps the latest state of every marker in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    markers: BTreeMap<MarkerHandle, RecordedMarker>,
    pub moves: u64,
    pub frames: u64,
    pub removed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMarker {
    pub info: MarkerInfo,
    pub position: Option<Cartesian3>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&RecordedMarker> {
        self.markers.get(&handle)
    }

    pub fn position(&self, handle: MarkerHandle) -> Option<&Cartesian3> {
        self.markers.get(&handle).and_then(|m| m.position.as_ref())
    }

    pub fn markers(&self) -> impl Iterator<Item = &RecordedMarker> {
        self.markers.values()
    }
}

impl MarkerSink for RecordingSink {
    fn add_markers(&mut self, markers: &[MarkerInfo]) {
        for info in markers {
            self.markers.insert(
                info.handle,
                RecordedMarker {
                    info: info.clone(),
                    position: None,
                },
            );
        }
    }

    fn move_marker(&mut self, handle: MarkerHandle, position: &Cartesian3) {
        self.moves += 1;
        if let Some(m) = self.markers.get_mut(&handle) {
            m.position = Some(*position);
        }
    }

    fn remove_markers(&mut self, handles: &[MarkerHandle]) {
        for h in handles {
            if self.markers.remove(h).is_some() {
                self.removed += 1;
            }
        }
    }

    fn end_frame(&mut self, _frame: &FrameInfo) {
        self.frames += 1;
    }
}

/// Logs marker traffic, for headless runs
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl MarkerSink for TracingSink {
    fn add_markers(&mut self, markers: &[MarkerInfo]) {
        for m in markers {
            debug!(handle = %m.handle, name = %m.name, catalog_number = ?m.catalog_number, "Marker added");
        }
    }

    fn move_marker(&mut self, handle: MarkerHandle, position: &Cartesian3) {
        debug!(handle = %handle, x = position.x, y = position.y, z = position.z, "Marker moved");
    }

    fn remove_markers(&mut self, handles: &[MarkerHandle]) {
        for h in handles {
            debug!(handle = %h, "Marker removed");
        }
    }

    fn end_frame(&mut self, frame: &FrameInfo) {
        debug!(frame = frame.frame, timestamp = %frame.timestamp, "Frame published");
    }
}

pub trait MarkerMessageType: Serialize {
    fn msg_type(&self) -> u8;
}

/// Length-and-type-prefixed JSON
/// Framing is a u32 le total length followed by the JSON body, which carries the u8 message type
pub struct Message {}

impl Message {
    pub fn send<T: MarkerMessageType, O: io::Write>(body: &T, stream: &mut O) -> io::Result<()> {
        #[derive(Serialize)]
        struct Msg<'a, T> {
            msg_type: u8,
            #[serde(flatten)]
            body: &'a T,
        }

        let msg = Msg {
            msg_type: body.msg_type(),
            body,
        };
        let m = serde_json::to_vec(&msg)?;
        let msg_len = m.len() as u32 + 4;
        stream.write_all(&msg_len.to_le_bytes())?;
        stream.write_all(&m)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SecAndUSecTimestamp {
    pub sec: i64,
    pub usec: u32,
}

impl From<Timestamp> for SecAndUSecTimestamp {
    fn from(value: Timestamp) -> Self {
        let t = value.as_utc();
        SecAndUSecTimestamp {
            sec: t.timestamp(),
            usec: t.timestamp_subsec_micros(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AddMarkers<'a> {
    pub markers: &'a [MarkerInfo],
}

impl<'a> MarkerMessageType for AddMarkers<'a> {
    fn msg_type(&self) -> u8 {
        1
    }
}

#[derive(Debug, Copy, Clone, Serialize)]
pub struct MarkerPosition {
    pub handle: MarkerHandle,
    #[serde(flatten)]
    pub position: Cartesian3,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerPositions<'a> {
    pub frame: u64,
    pub timestamp: SecAndUSecTimestamp,
    pub positions: &'a [MarkerPosition],
}

impl<'a> MarkerMessageType for MarkerPositions<'a> {
    fn msg_type(&self) -> u8 {
        2
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveMarkers<'a> {
    pub handles: &'a [MarkerHandle],
}

impl<'a> MarkerMessageType for RemoveMarkers<'a> {
    fn msg_type(&self) -> u8 {
        3
    }
}

/// Writes marker traffic as framed messages, one positions message per frame.
///
/// A write failure is logged once and disables the stream; the frame loop keeps running.
pub struct MarkerStream<W: io::Write> {
    writer: W,
    pending: Vec<MarkerPosition>,
    error: Option<io::Error>,
}

impl<W: io::Write> MarkerStream<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pending: Vec::new(),
            error: None,
        }
    }

    pub fn is_broken(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn send<T: MarkerMessageType>(&mut self, body: &T) {
        if self.error.is_some() {
            return;
        }
        let res = Message::send(body, &mut self.writer).and_then(|_| self.writer.flush());
        if let Err(e) = res {
            warn!(error = %e, "Marker stream write failed, disabling stream");
            self.error = Some(e);
        }
    }
}

impl<W: io::Write> MarkerSink for MarkerStream<W> {
    fn add_markers(&mut self, markers: &[MarkerInfo]) {
        self.send(&AddMarkers { markers });
    }

    fn move_marker(&mut self, handle: MarkerHandle, position: &Cartesian3) {
        self.pending.push(MarkerPosition {
            handle,
            position: *position,
        });
    }

    fn remove_markers(&mut self, handles: &[MarkerHandle]) {
        self.pending.retain(|p| !handles.contains(&p.handle));
        self.send(&RemoveMarkers { handles });
    }

    fn end_frame(&mut self, frame: &FrameInfo) {
        let pending = std::mem::take(&mut self.pending);
        self.send(&MarkerPositions {
            frame: frame.frame,
            timestamp: frame.timestamp.into(),
            positions: &pending,
        });
        // Reuse the allocation next frame
        self.pending = pending;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn info(id: u64, name: &str) -> MarkerInfo {
        MarkerInfo {
            handle: MarkerHandle::new(id),
            name: name.to_owned(),
            catalog_number: Some(25544),
        }
    }

    fn frame(n: u64) -> FrameInfo {
        let mut f = FrameInfo::new();
        f.frame_step("2008-09-20T13:00:00Z".parse().unwrap());
        f.frame = n;
        f
    }

    /// Split a byte stream into (declared length, JSON body) frames
    fn split_messages(mut bytes: &[u8]) -> Vec<(u32, Value)> {
        let mut msgs = Vec::new();
        while !bytes.is_empty() {
            let len = u32::from_le_bytes(bytes[..4].try_into().unwrap());
            let body = &bytes[4..len as usize];
            msgs.push((len, serde_json::from_slice(body).unwrap()));
            bytes = &bytes[len as usize..];
        }
        msgs
    }

    #[test]
    fn recording_sink_tracks_latest_position() {
        let mut sink = RecordingSink::new();
        sink.add_markers(&[info(0, "A"), info(1, "B")]);
        sink.move_marker(MarkerHandle::new(0), &Cartesian3::new(1.0, 0.0, 0.0));
        sink.move_marker(MarkerHandle::new(0), &Cartesian3::new(0.0, 1.0, 0.0));
        sink.end_frame(&frame(1));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.moves, 2);
        assert_eq!(sink.frames, 1);
        assert_eq!(
            sink.position(MarkerHandle::new(0)),
            Some(&Cartesian3::new(0.0, 1.0, 0.0))
        );
        assert_eq!(sink.position(MarkerHandle::new(1)), None);

        sink.remove_markers(&[MarkerHandle::new(0), MarkerHandle::new(9)]);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.removed, 1);
    }

    #[test]
    fn stream_framing() {
        let mut stream = MarkerStream::new(Vec::new());
        stream.add_markers(&[info(0, "ISS (ZARYA)")]);
        stream.move_marker(MarkerHandle::new(0), &Cartesian3::new(0.5, 1.0, -0.25));
        stream.end_frame(&frame(3));
        stream.remove_markers(&[MarkerHandle::new(0)]);
        assert!(!stream.is_broken());

        let msgs = split_messages(&stream.into_inner());
        assert_eq!(msgs.len(), 3);

        let (_, add) = &msgs[0];
        assert_eq!(add["msg_type"], 1);
        assert_eq!(add["markers"][0]["handle"], 0);
        assert_eq!(add["markers"][0]["name"], "ISS (ZARYA)");
        assert_eq!(add["markers"][0]["catalog_number"], 25544);

        let (_, positions) = &msgs[1];
        assert_eq!(positions["msg_type"], 2);
        assert_eq!(positions["frame"], 3);
        assert_eq!(positions["timestamp"]["sec"], 1221915600);
        assert_eq!(positions["positions"][0]["handle"], 0);
        assert_eq!(positions["positions"][0]["y"], 1.0);

        let (_, remove) = &msgs[2];
        assert_eq!(remove["msg_type"], 3);
        assert_eq!(remove["handles"][0], 0);
    }

    #[test]
    fn empty_frame_still_sends_positions() {
        let mut stream = MarkerStream::new(Vec::new());
        stream.end_frame(&frame(1));
        stream.end_frame(&frame(2));
        let msgs = split_messages(&stream.into_inner());
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].1["positions"].as_array().map(Vec::len), Some(0));
    }

    struct FailingWriter;

    impl io::Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "renderer gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_disables_stream() {
        let mut stream = MarkerStream::new(FailingWriter);
        stream.add_markers(&[info(0, "A")]);
        assert!(stream.is_broken());
        assert_eq!(
            stream.error().map(io::Error::kind),
            Some(io::ErrorKind::BrokenPipe)
        );
        stream.move_marker(MarkerHandle::new(0), &Cartesian3::default());
        stream.end_frame(&frame(1));
    }
}
