//! Packet builders shared by unit tests and benchmarks.
//!
//! Every builder fills the full 22-car array with zeroed entries and only
//! populates the entry at `player_index`, which is how a single-player
//! recording looks on the wire.

#![cfg(any(test, feature = "benchmark"))]

use crate::protocol::f1_24::{
    NUM_CARS, PACKET_FORMAT, PACKET_ID_CAR_STATUS, PACKET_ID_CAR_TELEMETRY, PACKET_ID_LAP_DATA,
    PACKET_ID_SESSION,
};
use crate::protocol::{
    CarStatusData, CarStatusPacket, CarTelemetryData, CarTelemetryPacket, LapData, LapDataPacket,
    Packet, PacketHeader, SessionData, SessionPacket,
};

/// Session uid used by the canned scenarios.
pub const SCENARIO_SESSION_UID: u64 = 0x00F1_2024_CAFE_0001;

pub fn header(packet_id: u8, session_uid: u64, session_time: f32, player_index: u8) -> PacketHeader {
    PacketHeader {
        packet_format: PACKET_FORMAT,
        game_year: 24,
        game_major_version: 1,
        game_minor_version: 5,
        packet_version: 1,
        packet_id,
        session_uid,
        session_time,
        frame_identifier: (session_time * 60.0) as u32,
        overall_frame_identifier: (session_time * 60.0) as u32,
        player_car_index: player_index,
        secondary_player_car_index: 255,
    }
}

pub fn session_packet(session_uid: u64, session_time: f32, track_id: i8, session_type: u8) -> Packet {
    Packet::Session(SessionPacket {
        header: header(PACKET_ID_SESSION, session_uid, session_time, 0),
        data: SessionData {
            track_id,
            session_type,
            total_laps: 5,
            track_length: 5_000,
            formula: 0,
            game_mode: 0,
            ..SessionData::default()
        },
    })
}

pub fn lap_data_packet(
    session_uid: u64,
    session_time: f32,
    player_index: u8,
    current_lap_num: u8,
    last_lap_time_in_ms: u32,
) -> Packet {
    let mut cars = vec![LapData::default(); NUM_CARS];
    if let Some(car) = cars.get_mut(usize::from(player_index)) {
        car.current_lap_num = current_lap_num;
        car.last_lap_time_in_ms = last_lap_time_in_ms;
        car.car_position = 1;
    }
    Packet::LapData(LapDataPacket {
        header: header(PACKET_ID_LAP_DATA, session_uid, session_time, player_index),
        cars,
        time_trial_pb_car_idx: 255,
        time_trial_rival_car_idx: 255,
    })
}

pub fn car_telemetry_packet(
    session_uid: u64,
    session_time: f32,
    player_index: u8,
    speed: u16,
) -> Packet {
    let mut cars = vec![CarTelemetryData::default(); NUM_CARS];
    if let Some(car) = cars.get_mut(usize::from(player_index)) {
        car.speed = speed;
        car.throttle = 1.0;
        car.brake = 0.0;
        car.gear = 7;
        car.engine_rpm = 11_000;
        car.drs = 0;
    }
    Packet::CarTelemetry(CarTelemetryPacket {
        header: header(PACKET_ID_CAR_TELEMETRY, session_uid, session_time, player_index),
        cars,
        mfd_panel_index: 255,
        mfd_panel_index_secondary_player: 255,
        suggested_gear: 0,
    })
}

pub fn car_status_packet(
    session_uid: u64,
    session_time: f32,
    player_index: u8,
    fuel_in_tank: f32,
    actual_tyre_compound: u8,
) -> Packet {
    let mut cars = vec![CarStatusData::default(); NUM_CARS];
    if let Some(car) = cars.get_mut(usize::from(player_index)) {
        car.fuel_in_tank = fuel_in_tank;
        car.actual_tyre_compound = actual_tyre_compound;
        car.visual_tyre_compound = actual_tyre_compound;
        car.ers_store_energy = 4_000_000.0;
        car.ers_deploy_mode = 1;
    }
    Packet::CarStatus(CarStatusPacket {
        header: header(PACKET_ID_CAR_STATUS, session_uid, session_time, player_index),
        cars,
    })
}

/// One lap at Monaco: session metadata, 50 Hz telemetry at 200 km/h from
/// t=2.0 through t=60.0, and a lap-data packet at t=60.0 reporting lap 1
/// finished in 58 000 ms.
pub fn single_lap_scenario(session_uid: u64) -> Vec<Packet> {
    let mut packets = vec![session_packet(session_uid, 0.5, 5, 15)];
    for tick in 100..=3000u32 {
        let t = tick as f32 / 50.0;
        packets.push(car_telemetry_packet(session_uid, t, 0, 200));
    }
    packets.push(lap_data_packet(session_uid, 60.0, 0, 2, 58_000));
    packets
}

/// `laps` consecutive laps of `lap_secs` each, with car status every second
/// and the compound switching from C3 (18) to C4 (17) halfway through.
pub fn multi_lap_scenario(session_uid: u64, laps: u8, lap_secs: u32) -> Vec<Packet> {
    let mut packets = vec![session_packet(session_uid, 0.0, 10, 10)];
    let total_ticks = u32::from(laps) * lap_secs * 50;
    for tick in 0..=total_ticks {
        let t = tick as f32 / 50.0;
        packets.push(car_telemetry_packet(session_uid, t, 0, 150 + (tick % 150) as u16));
        if tick % 50 == 0 {
            let compound = if tick < total_ticks / 2 { 18 } else { 17 };
            let fuel = 100.0 - tick as f32 / 500.0;
            packets.push(car_status_packet(session_uid, t, 0, fuel, compound));
        }
    }
    for lap in 1..=laps {
        let t = (u32::from(lap) * lap_secs) as f32;
        packets.push(lap_data_packet(session_uid, t, 0, lap + 1, lap_secs * 1000));
    }
    packets
}
