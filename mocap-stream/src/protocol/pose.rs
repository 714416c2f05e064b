//! Pose packets

use super::names::NameTable;
use super::reader::PayloadReader;
use crate::error::{Error, Result};
use crate::pose::Pose;
use glam::{Quat, Vec3};

/// Decode a pose payload (bytes after signature and kind)
///
/// `names` is the table in effect when the datagram arrived. The packet's
/// rotation count must equal its length; otherwise the whole packet is
/// rejected, which is routine for the frames between a rig change on the
/// sender and the arrival of the new names packet.
pub fn decode_pose(payload: &[u8], names: &NameTable) -> Result<Pose> {
    let mut r = PayloadReader::new(payload);

    // Right-handed sender -> left-handed host: mirror x
    let x = r.read_f32()?;
    let y = r.read_f32()?;
    let z = r.read_f32()?;
    let root_position = Vec3::new(-x, y, z);

    let count = r.read_i32()?;
    if usize::try_from(count).ok() != Some(names.len()) {
        return Err(Error::RotationCountMismatch {
            expected: names.len(),
            actual: count,
        });
    }

    let mut rotations = Vec::with_capacity(names.len());
    for name in names.iter() {
        // Mirroring x flips the rotation sense about y and z
        let qx = r.read_f32()?;
        let qy = r.read_f32()?;
        let qz = r.read_f32()?;
        let qw = r.read_f32()?;
        rotations.push((name.clone(), Quat::from_xyzw(qx, -qy, -qz, qw)));
    }

    Ok(Pose {
        root_name: names.root().map(str::to_owned),
        root_position,
        rotations,
    })
}
