//! Sender-side packet encoding
//!
//! Produces the same bytes the capture application sends, for loopback
//! testing and replaying recorded poses. [`encode_pose`] takes a host-space
//! [`Pose`] and applies the inverse axis flips; the `raw` variants write
//! sender-space values untouched.

use super::{KIND_LEN, PacketKind, SIGNATURE};
use crate::pose::Pose;

fn header(kind: PacketKind, payload_len: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SIGNATURE.len() + KIND_LEN + payload_len);
    buf.extend_from_slice(SIGNATURE);
    buf.extend_from_slice(&kind.tag().to_le_bytes());
    buf
}

fn put_f32s(buf: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

fn put_varint(buf: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Names payload (without signature and kind)
pub fn encode_names_payload<S: AsRef<str>>(names: &[S]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(names.len() as i32).to_le_bytes());
    for name in names {
        let bytes = name.as_ref().as_bytes();
        put_varint(&mut buf, bytes.len() as u32);
        buf.extend_from_slice(bytes);
    }
    buf
}

/// Complete names datagram
pub fn encode_names<S: AsRef<str>>(names: &[S]) -> Vec<u8> {
    let payload = encode_names_payload(names);
    let mut buf = header(PacketKind::Names, payload.len());
    buf.extend_from_slice(&payload);
    buf
}

/// Pose payload from sender-space values
///
/// `rotations` are `[x, y, z, w]` in name table order.
pub fn encode_raw_pose_payload(root_position: [f32; 3], rotations: &[[f32; 4]]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + rotations.len() * 16);
    put_f32s(&mut buf, &root_position);
    buf.extend_from_slice(&(rotations.len() as i32).to_le_bytes());
    for q in rotations {
        put_f32s(&mut buf, q);
    }
    buf
}

/// Complete pose datagram from sender-space values
pub fn encode_raw_pose(root_position: [f32; 3], rotations: &[[f32; 4]]) -> Vec<u8> {
    let payload = encode_raw_pose_payload(root_position, rotations);
    let mut buf = header(PacketKind::Pose, payload.len());
    buf.extend_from_slice(&payload);
    buf
}

/// Pose payload from a host-space pose
///
/// Only rotation values are written; their order must match the names
/// packet the receiver holds.
pub fn encode_pose_payload(pose: &Pose) -> Vec<u8> {
    let p = pose.root_position;
    let rotations: Vec<[f32; 4]> = pose
        .rotations
        .iter()
        .map(|(_, q)| [q.x, -q.y, -q.z, q.w])
        .collect();
    encode_raw_pose_payload([-p.x, p.y, p.z], &rotations)
}

/// Complete pose datagram from a host-space pose
pub fn encode_pose(pose: &Pose) -> Vec<u8> {
    let payload = encode_pose_payload(pose);
    let mut buf = header(PacketKind::Pose, payload.len());
    buf.extend_from_slice(&payload);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PayloadReader, classify};

    #[test]
    fn test_names_layout() {
        let bytes = encode_names(&["Hips"]);
        assert_eq!(&bytes[..8], b"iPiMocap");
        assert_eq!(&bytes[8..12], &1i32.to_le_bytes());
        assert_eq!(&bytes[12..16], &1i32.to_le_bytes());
        assert_eq!(&bytes[16..], b"\x04Hips");
    }

    #[test]
    fn test_long_name_uses_multibyte_prefix() {
        let long = "j".repeat(200);
        let payload = encode_names_payload(&[long.as_str()]);
        // 200 = 0xC8 -> 0xC8 0x01
        assert_eq!(&payload[4..6], &[0xC8, 0x01]);
        let mut r = PayloadReader::new(&payload[4..]);
        assert_eq!(r.read_string().unwrap(), long);
    }

    #[test]
    fn test_pose_layout() {
        let bytes = encode_raw_pose([1.0, 2.0, 3.0], &[[0.0, 0.0, 0.0, 1.0]]);
        let (kind, payload) = classify(&bytes).unwrap();
        assert_eq!(kind, PacketKind::Pose);
        assert_eq!(payload.len(), 12 + 4 + 16);
        assert_eq!(&payload[..4], &1.0f32.to_le_bytes());
        assert_eq!(&payload[12..16], &1i32.to_le_bytes());
    }
}
