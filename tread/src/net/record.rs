//! Fixed-size binary records exchanged between server and clients.

use core::f64::consts::SQRT_2;

use crate::math::{FreeCoordinate, FreePoint, FreeVector, Rotation};
use crate::net::AuthoritativeState;
use crate::time::TickNumber;
use crate::world::ObjectId;

/// Positions are sent in units of this fraction of a meter.
pub const POSITION_SCALE: FreeCoordinate = 1024.0;

/// Scale of the three smallest quaternion components, each of which is at most `1/√2` in
/// magnitude, so that they fill the range of `i16`.
const ORIENTATION_SCALE: FreeCoordinate = 32767.0 * SQRT_2;

/// Control inputs are sent in units of this fraction of their full range.
const INPUT_SCALE: FreeCoordinate = 127.0;

const AT_REST_FLAG: u8 = 1 << 0;

// -------------------------------------------------------------------------------------------------

macro_rules! le_int {
    ($name:ident, $int:ty, $bytes:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
        #[repr(transparent)]
        pub(crate) struct $name([u8; $bytes]);

        impl From<$int> for $name {
            fn from(value: $int) -> Self {
                Self(value.to_le_bytes())
            }
        }
        impl From<$name> for $int {
            fn from(value: $name) -> Self {
                <$int>::from_le_bytes(value.0)
            }
        }
    };
}

le_int!(Leu32, u32, 4, "u32, but in guaranteed little-endian, unaligned representation.");
le_int!(Lei32, i32, 4, "i32, but in guaranteed little-endian, unaligned representation.");
le_int!(Lei16, i16, 2, "i16, but in guaranteed little-endian, unaligned representation.");

// -------------------------------------------------------------------------------------------------

/// Ways that a received record can be invalid.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, displaydoc::Display, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The record was not the size of any record of its type.
    #[displaydoc("expected {expected} bytes, got {actual}")]
    WrongLength {
        /// Size of the record type.
        expected: usize,
        /// Size of the received data.
        actual: usize,
    },
    /// The orientation did not describe a rotation.
    #[displaydoc("invalid orientation encoding")]
    InvalidOrientation,
    /// A momentum component was infinite or NaN.
    #[displaydoc("non-finite momentum")]
    NonFinite,
}

fn read_record<T: bytemuck::AnyBitPattern>(bytes: &[u8]) -> Result<T, DecodeError> {
    bytemuck::try_pod_read_unaligned(bytes).map_err(|_| DecodeError::WrongLength {
        expected: size_of::<T>(),
        actual: bytes.len(),
    })
}

// -------------------------------------------------------------------------------------------------

bitflags::bitflags! {
    /// Momentary buttons in an [`InputRecord`].
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct Triggers: u8 {
        /// Jump (characters).
        const JUMP = 1 << 0;
        /// Brake (vehicles).
        const BRAKE = 1 << 1;
        /// Crouch (characters).
        const CROUCH = 1 << 2;
        /// Use the equipped tool.
        const FIRE = 1 << 3;
    }
}

/// One tick of a client's control input, sent to the server every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct InputRecord {
    /// Client tick the input was produced on.
    pub tick: TickNumber,
    /// Forward drive or movement, from -1 to 1.
    pub throttle: FreeCoordinate,
    /// Steering or turning, from -1 to 1 of the maximum.
    pub yaw: FreeCoordinate,
    /// Looking up or down, from -1 to 1 of the maximum.
    pub pitch: FreeCoordinate,
    /// Buttons held.
    pub triggers: Triggers,
}

impl InputRecord {
    /// Constructs an input record, clamping the axes to `[-1, 1]`.
    /// NaN axes are treated as zero.
    pub fn new(
        tick: TickNumber,
        throttle: FreeCoordinate,
        yaw: FreeCoordinate,
        pitch: FreeCoordinate,
        triggers: Triggers,
    ) -> Self {
        let axis = |value: FreeCoordinate| {
            if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) }
        };
        Self {
            tick,
            throttle: axis(throttle),
            yaw: axis(yaw),
            pitch: axis(pitch),
            triggers,
        }
    }

    /// Encodes this record for sending. Axes are quantized to 1/127.
    pub fn encode(&self) -> InputPacket {
        let axis = |value: FreeCoordinate| (value.clamp(-1.0, 1.0) * INPUT_SCALE).round() as i8;
        InputPacket {
            tick: self.tick.into(),
            throttle: axis(self.throttle),
            yaw: axis(self.yaw),
            pitch: axis(self.pitch),
            triggers: self.triggers.bits(),
        }
    }
}

/// Wire form of an [`InputRecord`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct InputPacket {
    tick: Leu32,
    throttle: i8,
    yaw: i8,
    pitch: i8,
    triggers: u8,
}

impl InputPacket {
    /// Size of the packet in bytes.
    pub const SIZE: usize = size_of::<Self>();

    /// Reads a packet from received bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        read_record(bytes)
    }

    /// The bytes to send.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decodes the input. Unknown trigger bits are ignored.
    pub fn decode(&self) -> InputRecord {
        let axis = |value: i8| (FreeCoordinate::from(value) / INPUT_SCALE).clamp(-1.0, 1.0);
        InputRecord {
            tick: self.tick.into(),
            throttle: axis(self.throttle),
            yaw: axis(self.yaw),
            pitch: axis(self.pitch),
            triggers: Triggers::from_bits_truncate(self.triggers),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// An [`AuthoritativeState`] addressed to an object, as sent by the server.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct StateUpdate {
    /// Object the state belongs to.
    pub object: ObjectId,
    /// Server tick at the end of which the state was taken.
    pub tick: TickNumber,
    /// The state.
    pub state: AuthoritativeState,
}

impl StateUpdate {
    /// Constructs an update.
    pub fn new(object: ObjectId, tick: TickNumber, state: AuthoritativeState) -> Self {
        Self {
            object,
            tick,
            state,
        }
    }

    /// Encodes this update for sending.
    ///
    /// Positions are quantized to 1/1024 m (saturating beyond ±2097 km), momenta are
    /// reduced to single precision, and the orientation is reduced to its three smallest
    /// quaternion components.
    pub fn encode(&self) -> StatePacket {
        let state = &self.state;
        let position = state
            .position
            .to_array()
            .map(|c| Lei32::from((c * POSITION_SCALE).round() as i32));
        let (orientation, largest_index) = encode_orientation(&state.orientation);
        StatePacket {
            object: self.object.get().into(),
            tick: self.tick.into(),
            position,
            linear_momentum: encode_vector(state.linear_momentum),
            angular_momentum: encode_vector(state.angular_momentum),
            orientation,
            largest_index,
            flags: if state.at_rest { AT_REST_FLAG } else { 0 },
        }
    }
}

/// Wire form of a [`StateUpdate`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct StatePacket {
    object: Leu32,
    tick: Leu32,
    position: [Lei32; 3],
    linear_momentum: [Leu32; 3],
    angular_momentum: [Leu32; 3],
    orientation: [Lei16; 3],
    largest_index: u8,
    flags: u8,
}

impl StatePacket {
    /// Size of the packet in bytes.
    pub const SIZE: usize = size_of::<Self>();

    /// Reads a packet from received bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        read_record(bytes)
    }

    /// The bytes to send.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decodes the update.
    pub fn decode(&self) -> Result<StateUpdate, DecodeError> {
        let position = self
            .position
            .map(|c| FreeCoordinate::from(i32::from(c)) / POSITION_SCALE);
        Ok(StateUpdate {
            object: ObjectId::new(self.object.into()),
            tick: self.tick.into(),
            state: AuthoritativeState {
                position: FreePoint::from(position),
                orientation: decode_orientation(self.orientation, self.largest_index)?,
                linear_momentum: decode_vector(self.linear_momentum)?,
                angular_momentum: decode_vector(self.angular_momentum)?,
                at_rest: self.flags & AT_REST_FLAG != 0,
            },
        })
    }
}

fn encode_vector(vector: FreeVector) -> [Leu32; 3] {
    vector.to_array().map(|c| Leu32::from((c as f32).to_bits()))
}

fn decode_vector(encoded: [Leu32; 3]) -> Result<FreeVector, DecodeError> {
    let components = encoded.map(|c| FreeCoordinate::from(f32::from_bits(c.into())));
    if components.iter().all(|c| c.is_finite()) {
        Ok(FreeVector::from(components))
    } else {
        Err(DecodeError::NonFinite)
    }
}

/// Encodes a rotation as the three quaternion components other than the one of largest
/// magnitude, with the sign chosen so that the omitted component is positive.
fn encode_orientation(orientation: &Rotation) -> ([Lei16; 3], u8) {
    let q = orientation.normalize();
    let components = [q.i, q.j, q.k, q.r];
    let largest_index = (0..4)
        .max_by(|&a, &b| components[a].abs().total_cmp(&components[b].abs()))
        .unwrap_or(3);
    let sign = if components[largest_index] < 0.0 { -1.0 } else { 1.0 };
    let mut encoded = [Lei16::default(); 3];
    for (slot, index) in encoded
        .iter_mut()
        .zip((0..4).filter(|&i| i != largest_index))
    {
        *slot = Lei16::from((components[index] * sign * ORIENTATION_SCALE).round() as i16);
    }
    (encoded, largest_index as u8)
}

fn decode_orientation(encoded: [Lei16; 3], largest_index: u8) -> Result<Rotation, DecodeError> {
    let largest_index = usize::from(largest_index);
    if largest_index > 3 {
        return Err(DecodeError::InvalidOrientation);
    }
    let small = encoded.map(|c| FreeCoordinate::from(i16::from(c)) / ORIENTATION_SCALE);
    let sum_of_squares: FreeCoordinate = small.iter().map(|c| c * c).sum();
    if sum_of_squares > 1.0 {
        return Err(DecodeError::InvalidOrientation);
    }
    let mut components = [0.0; 4];
    let mut small = small.into_iter();
    for (index, slot) in components.iter_mut().enumerate() {
        *slot = if index == largest_index {
            (1.0 - sum_of_squares).sqrt()
        } else {
            small.next().unwrap_or(0.0)
        };
    }
    let [i, j, k, r] = components;
    Ok(Rotation::quaternion(i, j, k, r).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{LocalVector, angle_between};
    use euclid::{Angle, point3, vec3};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn sizes() {
        assert_eq!(StatePacket::SIZE, 52);
        assert_eq!(InputPacket::SIZE, 8);
    }

    #[test]
    fn little_endian_layout() {
        let packet = StateUpdate::new(
            ObjectId::new(0x0102_0304),
            7,
            AuthoritativeState::at_rest_at(point3(1.0, 0.0, -1.0), Rotation::identity()),
        )
        .encode();
        let bytes = packet.as_bytes();
        assert_eq!(&bytes[0..4], &[4, 3, 2, 1]);
        assert_eq!(&bytes[4..8], &[7, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &1024i32.to_le_bytes());
        assert_eq!(&bytes[16..20], &(-1024i32).to_le_bytes());
        assert_eq!(bytes[50], 3, "largest component of the identity is r");
        assert_eq!(bytes[51], AT_REST_FLAG);
    }

    #[rstest]
    #[case::identity(vec3(0.0, 0.0, 1.0), 0.0)]
    #[case::yaw(vec3(0.0, 0.0, 1.0), 2.5)]
    #[case::half_turn(vec3(1.0, 0.0, 0.0), core::f64::consts::PI)]
    #[case::skew(vec3(1.0, -2.0, 0.5), -1.2)]
    fn orientation_precision(#[case] axis: LocalVector, #[case] angle: FreeCoordinate) {
        let rotation = Rotation::around_axis(axis, Angle::radians(angle));
        let (encoded, index) = encode_orientation(&rotation);
        let decoded = decode_orientation(encoded, index).unwrap();
        assert!(angle_between(&rotation, &decoded) < 1e-4);
    }

    #[test]
    fn rejects_bad_orientation() {
        assert_eq!(
            decode_orientation([Lei16::default(); 3], 4),
            Err(DecodeError::InvalidOrientation)
        );
        assert_eq!(
            decode_orientation([Lei16::from(i16::MAX); 3], 0),
            Err(DecodeError::InvalidOrientation)
        );
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            StatePacket::from_bytes(&[0; 51]),
            Err(DecodeError::WrongLength {
                expected: 52,
                actual: 51
            })
        );
        assert_eq!(
            InputPacket::from_bytes(&[0; 9]).unwrap_err().to_string(),
            "expected 8 bytes, got 9"
        );
    }

    #[test]
    fn rejects_non_finite_momentum() {
        let mut bytes = StateUpdate::new(
            ObjectId::new(1),
            0,
            AuthoritativeState::at_rest_at(point3(0.0, 0.0, 0.0), Rotation::identity()),
        )
        .encode()
        .as_bytes()
        .to_vec();
        bytes[20..24].copy_from_slice(&f32::NAN.to_bits().to_le_bytes());
        let packet = StatePacket::from_bytes(&bytes).unwrap();
        assert_eq!(packet.decode(), Err(DecodeError::NonFinite));
    }

    #[test]
    fn input_quantization() {
        let record = InputRecord::new(99, 0.3, -2.0, f64::NAN, Triggers::JUMP | Triggers::FIRE);
        let packet = InputPacket::from_bytes(record.encode().as_bytes()).unwrap();
        let decoded = packet.decode();
        assert_eq!(decoded.tick, 99);
        assert!((decoded.throttle - 0.3).abs() <= 0.5 / INPUT_SCALE);
        assert_eq!(decoded.yaw, -1.0);
        assert_eq!(decoded.pitch, 0.0);
        assert_eq!(decoded.triggers, Triggers::JUMP | Triggers::FIRE);
    }

    #[test]
    fn unknown_trigger_bits_are_ignored() {
        let mut bytes = InputRecord::default().encode().as_bytes().to_vec();
        bytes[7] = 0xF2;
        let decoded = InputPacket::from_bytes(&bytes).unwrap().decode();
        assert_eq!(decoded.triggers, Triggers::BRAKE);
    }
}
