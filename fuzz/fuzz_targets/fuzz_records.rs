#![no_main]

use libfuzzer_sys::fuzz_target;

use pretty_assertions::assert_eq;

use tread::net::{InputPacket, StatePacket};

fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = InputPacket::from_bytes(data) {
        let input = packet.decode();
        for axis in [input.throttle, input.yaw, input.pitch] {
            assert!((-1.0..=1.0).contains(&axis), "axis out of range: {input:?}");
        }
        // Decoding drops unknown trigger bits, so compare the decoded forms.
        assert_eq!(input.encode().decode(), input);
    }

    match StatePacket::from_bytes(data).and_then(|packet| packet.decode()) {
        Ok(update) => {
            let again = update
                .encode()
                .decode()
                .expect("re-encoded state should decode");
            assert_eq!((again.object, again.tick), (update.object, update.tick));
            // Positions and momenta are already quantized, so they survive exactly.
            assert_eq!(again.state.position, update.state.position);
            assert_eq!(again.state.linear_momentum, update.state.linear_momentum);
            assert_eq!(again.state.angular_momentum, update.state.angular_momentum);
            assert_eq!(again.state.at_rest, update.state.at_rest);
        }
        Err(_) => {
            // Malformed records are expected; this fuzz test is looking for no panic.
        }
    }
});
