//! Packet builders for integration tests.

#![allow(dead_code)]

use laptrace::protocol::f1_24::{NUM_CARS, PACKET_FORMAT};
use laptrace::protocol::{
    CarStatusData, CarStatusPacket, CarTelemetryData, CarTelemetryPacket, LapData, LapDataPacket,
    Packet, PacketHeader, SessionData, SessionPacket,
};

pub fn header(packet_id: u8, session_uid: u64, session_time: f32) -> PacketHeader {
    PacketHeader {
        packet_format: PACKET_FORMAT,
        game_year: 24,
        game_major_version: 1,
        game_minor_version: 5,
        packet_version: 1,
        packet_id,
        session_uid,
        session_time,
        frame_identifier: 0,
        overall_frame_identifier: 0,
        player_car_index: 0,
        secondary_player_car_index: 255,
    }
}

pub fn session(session_uid: u64, session_time: f32, track_id: i8, session_type: u8) -> Packet {
    Packet::Session(SessionPacket {
        header: header(1, session_uid, session_time),
        data: SessionData { track_id, session_type, ..SessionData::default() },
    })
}

pub fn lap_data(session_uid: u64, session_time: f32, current_lap_num: u8, last_lap_ms: u32) -> Packet {
    let mut cars = vec![LapData::default(); NUM_CARS];
    cars[0].current_lap_num = current_lap_num;
    cars[0].last_lap_time_in_ms = last_lap_ms;
    Packet::LapData(LapDataPacket {
        header: header(2, session_uid, session_time),
        cars,
        time_trial_pb_car_idx: 255,
        time_trial_rival_car_idx: 255,
    })
}

pub fn telemetry(session_uid: u64, session_time: f32, speed: u16) -> Packet {
    let mut cars = vec![CarTelemetryData::default(); NUM_CARS];
    cars[0].speed = speed;
    cars[0].throttle = 0.8;
    cars[0].gear = 6;
    cars[0].engine_rpm = 10_500;
    Packet::CarTelemetry(CarTelemetryPacket {
        header: header(6, session_uid, session_time),
        cars,
        mfd_panel_index: 255,
        mfd_panel_index_secondary_player: 255,
        suggested_gear: 0,
    })
}

pub fn status(session_uid: u64, session_time: f32, fuel: f32, compound: u8) -> Packet {
    let mut cars = vec![CarStatusData::default(); NUM_CARS];
    cars[0].fuel_in_tank = fuel;
    cars[0].actual_tyre_compound = compound;
    Packet::CarStatus(CarStatusPacket { header: header(7, session_uid, session_time), cars })
}
