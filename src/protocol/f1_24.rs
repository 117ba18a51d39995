//! F1 24 UDP packet layout (packet format `2024`).
//!
//! Every packet starts with the 29-byte [`PacketHeader`]; the header's
//! `packet_id` selects the body layout. Only the bodies this crate consumes are
//! decoded field by field:
//!
//! | Packet ID | Name          | Size (bytes)          |
//! |-----------|---------------|-----------------------|
//! | 1         | Session       | 753                   |
//! | 2         | Lap Data      | 1285 (22 × 57 + 2)    |
//! | 6         | Car Telemetry | 1352 (22 × 60 + 3)    |
//! | 7         | Car Status    | 1239 (22 × 55)        |
//!
//! The remaining ids of the format (0–14) decode to [`Packet::Unknown`] with
//! the header only. All multi-byte fields are little-endian.
//!
//! A different packet format is a different module: offsets here are never
//! patched to accommodate another game year.

use serde::{Deserialize, Serialize};

use super::bytes::{ByteReader, ByteWriter};
use super::lossless::{float_array_serde, float_serde};
use super::{DecodeError, Packet, UnknownPacket};

/// Packet format discriminator carried in every header.
pub const PACKET_FORMAT: u16 = 2024;
/// Cars carried in every per-car array.
pub const NUM_CARS: usize = 22;
/// Highest packet id defined by this format.
pub const MAX_PACKET_ID: u8 = 14;

pub const HEADER_SIZE: usize = 29;
pub const SESSION_PAYLOAD_SIZE: usize = 724;
pub const LAP_DATA_ENTRY_SIZE: usize = 57;
pub const CAR_TELEMETRY_ENTRY_SIZE: usize = 60;
pub const CAR_STATUS_ENTRY_SIZE: usize = 55;

pub const SESSION_PACKET_SIZE: usize = HEADER_SIZE + SESSION_PAYLOAD_SIZE;
pub const LAP_DATA_PACKET_SIZE: usize = HEADER_SIZE + NUM_CARS * LAP_DATA_ENTRY_SIZE + 2;
pub const CAR_TELEMETRY_PACKET_SIZE: usize =
    HEADER_SIZE + NUM_CARS * CAR_TELEMETRY_ENTRY_SIZE + 3;
pub const CAR_STATUS_PACKET_SIZE: usize = HEADER_SIZE + NUM_CARS * CAR_STATUS_ENTRY_SIZE;

/// Largest packet body this module decodes.
pub const MAX_CONSUMED_PACKET_SIZE: usize = CAR_TELEMETRY_PACKET_SIZE;

pub const PACKET_ID_SESSION: u8 = 1;
pub const PACKET_ID_LAP_DATA: u8 = 2;
pub const PACKET_ID_CAR_TELEMETRY: u8 = 6;
pub const PACKET_ID_CAR_STATUS: u8 = 7;

// Session payload offsets that are not contiguous with the leading block.
const SESSION_SAFETY_CAR_STATUS: usize = 124;
const SESSION_AI_DIFFICULTY: usize = 640;
const SESSION_GAME_MODE: usize = 665;
const SESSION_LENGTH: usize = 671;

/// Common header of every packet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacketHeader {
    pub packet_format: u16,
    pub game_year: u8,
    pub game_major_version: u8,
    pub game_minor_version: u8,
    pub packet_version: u8,
    pub packet_id: u8,
    /// Unique per session; `0` until the game assigns one.
    pub session_uid: u64,
    /// Seconds since the session started.
    #[serde(with = "float_serde")]
    pub session_time: f32,
    pub frame_identifier: u32,
    pub overall_frame_identifier: u32,
    pub player_car_index: u8,
    /// `255` when there is no second player.
    pub secondary_player_car_index: u8,
}

impl PacketHeader {
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        require_len(raw, "header", HEADER_SIZE)?;
        let mut r = ByteReader::new(raw);
        Ok(Self {
            packet_format: r.u16_le()?,            // 0-1
            game_year: r.u8()?,                    // 2
            game_major_version: r.u8()?,           // 3
            game_minor_version: r.u8()?,           // 4
            packet_version: r.u8()?,               // 5
            packet_id: r.u8()?,                    // 6
            session_uid: r.u64_le()?,              // 7-14
            session_time: r.f32_le()?,             // 15-18
            frame_identifier: r.u32_le()?,         // 19-22
            overall_frame_identifier: r.u32_le()?, // 23-26
            player_car_index: r.u8()?,             // 27
            secondary_player_car_index: r.u8()?,   // 28
        })
    }

    pub fn encode(&self, w: &mut ByteWriter) {
        w.u16_le(self.packet_format);
        w.u8(self.game_year);
        w.u8(self.game_major_version);
        w.u8(self.game_minor_version);
        w.u8(self.packet_version);
        w.u8(self.packet_id);
        w.u64_le(self.session_uid);
        w.f32_le(self.session_time);
        w.u32_le(self.frame_identifier);
        w.u32_le(self.overall_frame_identifier);
        w.u8(self.player_car_index);
        w.u8(self.secondary_player_car_index);
    }

    /// The player car index, when it addresses a slot of the per-car arrays.
    pub fn player_index(&self) -> Option<u8> {
        (usize::from(self.player_car_index) < NUM_CARS).then_some(self.player_car_index)
    }
}

/// Session-level data (packet id 1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub weather: u8,
    pub track_temperature: i8,
    pub air_temperature: i8,
    pub total_laps: u8,
    /// Metres.
    pub track_length: u16,
    pub session_type: u8,
    /// `-1` for unknown.
    pub track_id: i8,
    pub formula: u8,
    /// Seconds.
    pub session_time_left: u16,
    /// Seconds.
    pub session_duration: u16,
    /// km/h.
    pub pit_speed_limit: u8,
    pub game_paused: u8,
    pub is_spectating: u8,
    pub spectator_car_index: u8,
    pub safety_car_status: u8,
    pub network_game: u8,
    pub ai_difficulty: u8,
    pub season_link_identifier: u32,
    pub weekend_link_identifier: u32,
    pub session_link_identifier: u32,
    pub game_mode: u8,
    pub rule_set: u8,
    /// Minutes since midnight.
    pub time_of_day: u32,
    pub session_length: u8,
}

impl SessionData {
    fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        let mut r = ByteReader::at(raw, HEADER_SIZE);
        let weather = r.u8()?; // 0
        let track_temperature = r.i8()?; // 1
        let air_temperature = r.i8()?; // 2
        let total_laps = r.u8()?; // 3
        let track_length = r.u16_le()?; // 4-5
        let session_type = r.u8()?; // 6
        let track_id = r.i8()?; // 7
        let formula = r.u8()?; // 8
        let session_time_left = r.u16_le()?; // 9-10
        let session_duration = r.u16_le()?; // 11-12
        let pit_speed_limit = r.u8()?; // 13
        let game_paused = r.u8()?; // 14
        let is_spectating = r.u8()?; // 15
        let spectator_car_index = r.u8()?; // 16
        // sliProNativeSupport (17), numMarshalZones (18), marshalZones[21] (19-123)

        r.seek(HEADER_SIZE + SESSION_SAFETY_CAR_STATUS)?;
        let safety_car_status = r.u8()?; // 124
        let network_game = r.u8()?; // 125
        // weather forecast block (126-638), forecastAccuracy (639)

        r.seek(HEADER_SIZE + SESSION_AI_DIFFICULTY)?;
        let ai_difficulty = r.u8()?; // 640
        let season_link_identifier = r.u32_le()?; // 641-644
        let weekend_link_identifier = r.u32_le()?; // 645-648
        let session_link_identifier = r.u32_le()?; // 649-652
        // pit stop window (653-655), assists (656-664)

        r.seek(HEADER_SIZE + SESSION_GAME_MODE)?;
        let game_mode = r.u8()?; // 665
        let rule_set = r.u8()?; // 666
        let time_of_day = r.u32_le()?; // 667-670
        let session_length = r.u8()?; // 671
        // units, rule toggles, weekend structure, sector starts (672-723)

        debug_assert_eq!(r.position(), HEADER_SIZE + SESSION_LENGTH + 1);

        Ok(Self {
            weather,
            track_temperature,
            air_temperature,
            total_laps,
            track_length,
            session_type,
            track_id,
            formula,
            session_time_left,
            session_duration,
            pit_speed_limit,
            game_paused,
            is_spectating,
            spectator_car_index,
            safety_car_status,
            network_game,
            ai_difficulty,
            season_link_identifier,
            weekend_link_identifier,
            session_link_identifier,
            game_mode,
            rule_set,
            time_of_day,
            session_length,
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.u8(self.weather);
        w.i8(self.track_temperature);
        w.i8(self.air_temperature);
        w.u8(self.total_laps);
        w.u16_le(self.track_length);
        w.u8(self.session_type);
        w.i8(self.track_id);
        w.u8(self.formula);
        w.u16_le(self.session_time_left);
        w.u16_le(self.session_duration);
        w.u8(self.pit_speed_limit);
        w.u8(self.game_paused);
        w.u8(self.is_spectating);
        w.u8(self.spectator_car_index);

        w.pad_to(HEADER_SIZE + SESSION_SAFETY_CAR_STATUS);
        w.u8(self.safety_car_status);
        w.u8(self.network_game);

        w.pad_to(HEADER_SIZE + SESSION_AI_DIFFICULTY);
        w.u8(self.ai_difficulty);
        w.u32_le(self.season_link_identifier);
        w.u32_le(self.weekend_link_identifier);
        w.u32_le(self.session_link_identifier);

        w.pad_to(HEADER_SIZE + SESSION_GAME_MODE);
        w.u8(self.game_mode);
        w.u8(self.rule_set);
        w.u32_le(self.time_of_day);
        w.u8(self.session_length);

        w.pad_to(SESSION_PACKET_SIZE);
    }
}

/// Per-car lap timing (packet id 2).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LapData {
    /// Duration of the most recently completed lap, 0 before the first one.
    pub last_lap_time_in_ms: u32,
    pub current_lap_time_in_ms: u32,
    pub sector1_time_ms_part: u16,
    pub sector1_time_minutes_part: u8,
    pub sector2_time_ms_part: u16,
    pub sector2_time_minutes_part: u8,
    pub delta_to_car_in_front_ms_part: u16,
    pub delta_to_car_in_front_minutes_part: u8,
    pub delta_to_race_leader_ms_part: u16,
    pub delta_to_race_leader_minutes_part: u8,
    #[serde(with = "float_serde")]
    pub lap_distance: f32,
    #[serde(with = "float_serde")]
    pub total_distance: f32,
    #[serde(with = "float_serde")]
    pub safety_car_delta: f32,
    pub car_position: u8,
    /// Lap currently being driven, starting at 1.
    pub current_lap_num: u8,
    pub pit_status: u8,
    pub num_pit_stops: u8,
    pub sector: u8,
    pub current_lap_invalid: u8,
    pub penalties: u8,
    pub total_warnings: u8,
    pub corner_cutting_warnings: u8,
    pub num_unserved_drive_through_pens: u8,
    pub num_unserved_stop_go_pens: u8,
    pub grid_position: u8,
    pub driver_status: u8,
    pub result_status: u8,
    pub pit_lane_timer_active: u8,
    pub pit_lane_time_in_lane_in_ms: u16,
    pub pit_stop_timer_in_ms: u16,
    pub pit_stop_should_serve_pen: u8,
    #[serde(with = "float_serde")]
    pub speed_trap_fastest_speed: f32,
    pub speed_trap_fastest_lap: u8,
}

impl LapData {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            last_lap_time_in_ms: r.u32_le()?,              // 0-3
            current_lap_time_in_ms: r.u32_le()?,           // 4-7
            sector1_time_ms_part: r.u16_le()?,             // 8-9
            sector1_time_minutes_part: r.u8()?,            // 10
            sector2_time_ms_part: r.u16_le()?,             // 11-12
            sector2_time_minutes_part: r.u8()?,            // 13
            delta_to_car_in_front_ms_part: r.u16_le()?,    // 14-15
            delta_to_car_in_front_minutes_part: r.u8()?,   // 16
            delta_to_race_leader_ms_part: r.u16_le()?,     // 17-18
            delta_to_race_leader_minutes_part: r.u8()?,    // 19
            lap_distance: r.f32_le()?,                     // 20-23
            total_distance: r.f32_le()?,                   // 24-27
            safety_car_delta: r.f32_le()?,                 // 28-31
            car_position: r.u8()?,                         // 32
            current_lap_num: r.u8()?,                      // 33
            pit_status: r.u8()?,                           // 34
            num_pit_stops: r.u8()?,                        // 35
            sector: r.u8()?,                               // 36
            current_lap_invalid: r.u8()?,                  // 37
            penalties: r.u8()?,                            // 38
            total_warnings: r.u8()?,                       // 39
            corner_cutting_warnings: r.u8()?,              // 40
            num_unserved_drive_through_pens: r.u8()?,      // 41
            num_unserved_stop_go_pens: r.u8()?,            // 42
            grid_position: r.u8()?,                        // 43
            driver_status: r.u8()?,                        // 44
            result_status: r.u8()?,                        // 45
            pit_lane_timer_active: r.u8()?,                // 46
            pit_lane_time_in_lane_in_ms: r.u16_le()?,      // 47-48
            pit_stop_timer_in_ms: r.u16_le()?,             // 49-50
            pit_stop_should_serve_pen: r.u8()?,            // 51
            speed_trap_fastest_speed: r.f32_le()?,         // 52-55
            speed_trap_fastest_lap: r.u8()?,               // 56
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.u32_le(self.last_lap_time_in_ms);
        w.u32_le(self.current_lap_time_in_ms);
        w.u16_le(self.sector1_time_ms_part);
        w.u8(self.sector1_time_minutes_part);
        w.u16_le(self.sector2_time_ms_part);
        w.u8(self.sector2_time_minutes_part);
        w.u16_le(self.delta_to_car_in_front_ms_part);
        w.u8(self.delta_to_car_in_front_minutes_part);
        w.u16_le(self.delta_to_race_leader_ms_part);
        w.u8(self.delta_to_race_leader_minutes_part);
        w.f32_le(self.lap_distance);
        w.f32_le(self.total_distance);
        w.f32_le(self.safety_car_delta);
        w.u8(self.car_position);
        w.u8(self.current_lap_num);
        w.u8(self.pit_status);
        w.u8(self.num_pit_stops);
        w.u8(self.sector);
        w.u8(self.current_lap_invalid);
        w.u8(self.penalties);
        w.u8(self.total_warnings);
        w.u8(self.corner_cutting_warnings);
        w.u8(self.num_unserved_drive_through_pens);
        w.u8(self.num_unserved_stop_go_pens);
        w.u8(self.grid_position);
        w.u8(self.driver_status);
        w.u8(self.result_status);
        w.u8(self.pit_lane_timer_active);
        w.u16_le(self.pit_lane_time_in_lane_in_ms);
        w.u16_le(self.pit_stop_timer_in_ms);
        w.u8(self.pit_stop_should_serve_pen);
        w.f32_le(self.speed_trap_fastest_speed);
        w.u8(self.speed_trap_fastest_lap);
    }
}

/// Per-car physical telemetry (packet id 6).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarTelemetryData {
    /// km/h.
    pub speed: u16,
    /// 0.0–1.0.
    #[serde(with = "float_serde")]
    pub throttle: f32,
    /// -1.0 (full left) to 1.0 (full right).
    #[serde(with = "float_serde")]
    pub steer: f32,
    /// 0.0–1.0.
    #[serde(with = "float_serde")]
    pub brake: f32,
    /// 0–100.
    pub clutch: u8,
    /// -1 reverse, 0 neutral, 1–8 forward.
    pub gear: i8,
    pub engine_rpm: u16,
    /// 0 off, 1 on.
    pub drs: u8,
    pub rev_lights_percent: u8,
    pub rev_lights_bit_value: u16,
    /// °C, [RL, RR, FL, FR].
    pub brakes_temperature: [u16; 4],
    pub tyres_surface_temperature: [u8; 4],
    pub tyres_inner_temperature: [u8; 4],
    pub engine_temperature: u16,
    /// PSI.
    #[serde(with = "float_array_serde")]
    pub tyres_pressure: [f32; 4],
    pub surface_type: [u8; 4],
}

impl CarTelemetryData {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            speed: r.u16_le()?,                          // 0-1
            throttle: r.f32_le()?,                       // 2-5
            steer: r.f32_le()?,                          // 6-9
            brake: r.f32_le()?,                          // 10-13
            clutch: r.u8()?,                             // 14
            gear: r.i8()?,                               // 15
            engine_rpm: r.u16_le()?,                     // 16-17
            drs: r.u8()?,                                // 18
            rev_lights_percent: r.u8()?,                 // 19
            rev_lights_bit_value: r.u16_le()?,           // 20-21
            brakes_temperature: r.u16_le_array::<4>()?,  // 22-29
            tyres_surface_temperature: r.u8_array::<4>()?, // 30-33
            tyres_inner_temperature: r.u8_array::<4>()?, // 34-37
            engine_temperature: r.u16_le()?,             // 38-39
            tyres_pressure: r.f32_le_array::<4>()?,      // 40-55
            surface_type: r.u8_array::<4>()?,            // 56-59
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.u16_le(self.speed);
        w.f32_le(self.throttle);
        w.f32_le(self.steer);
        w.f32_le(self.brake);
        w.u8(self.clutch);
        w.i8(self.gear);
        w.u16_le(self.engine_rpm);
        w.u8(self.drs);
        w.u8(self.rev_lights_percent);
        w.u16_le(self.rev_lights_bit_value);
        w.u16_le_array(&self.brakes_temperature);
        w.bytes(&self.tyres_surface_temperature);
        w.bytes(&self.tyres_inner_temperature);
        w.u16_le(self.engine_temperature);
        w.f32_le_array(&self.tyres_pressure);
        w.bytes(&self.surface_type);
    }
}

/// Per-car status (packet id 7).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarStatusData {
    pub traction_control: u8,
    pub anti_lock_brakes: u8,
    pub fuel_mix: u8,
    pub front_brake_bias: u8,
    pub pit_limiter_status: u8,
    /// kg.
    #[serde(with = "float_serde")]
    pub fuel_in_tank: f32,
    #[serde(with = "float_serde")]
    pub fuel_capacity: f32,
    #[serde(with = "float_serde")]
    pub fuel_remaining_laps: f32,
    pub max_rpm: u16,
    pub idle_rpm: u16,
    pub max_gears: u8,
    pub drs_allowed: u8,
    pub drs_activation_distance: u16,
    /// Compound code, e.g. 16 = C5 … 21 = C0, 7 = inter, 8 = wet.
    pub actual_tyre_compound: u8,
    pub visual_tyre_compound: u8,
    pub tyres_age_laps: u8,
    pub vehicle_fia_flags: i8,
    /// Watts.
    #[serde(with = "float_serde")]
    pub engine_power_ice: f32,
    /// Watts.
    #[serde(with = "float_serde")]
    pub engine_power_mguk: f32,
    /// Joules.
    #[serde(with = "float_serde")]
    pub ers_store_energy: f32,
    pub ers_deploy_mode: u8,
    #[serde(with = "float_serde")]
    pub ers_harvested_this_lap_mguk: f32,
    #[serde(with = "float_serde")]
    pub ers_harvested_this_lap_mguh: f32,
    #[serde(with = "float_serde")]
    pub ers_deployed_this_lap: f32,
    pub network_paused: u8,
}

impl CarStatusData {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            traction_control: r.u8()?,                // 0
            anti_lock_brakes: r.u8()?,                // 1
            fuel_mix: r.u8()?,                        // 2
            front_brake_bias: r.u8()?,                // 3
            pit_limiter_status: r.u8()?,              // 4
            fuel_in_tank: r.f32_le()?,                // 5-8
            fuel_capacity: r.f32_le()?,               // 9-12
            fuel_remaining_laps: r.f32_le()?,         // 13-16
            max_rpm: r.u16_le()?,                     // 17-18
            idle_rpm: r.u16_le()?,                    // 19-20
            max_gears: r.u8()?,                       // 21
            drs_allowed: r.u8()?,                     // 22
            drs_activation_distance: r.u16_le()?,     // 23-24
            actual_tyre_compound: r.u8()?,            // 25
            visual_tyre_compound: r.u8()?,            // 26
            tyres_age_laps: r.u8()?,                  // 27
            vehicle_fia_flags: r.i8()?,               // 28
            engine_power_ice: r.f32_le()?,            // 29-32
            engine_power_mguk: r.f32_le()?,           // 33-36
            ers_store_energy: r.f32_le()?,            // 37-40
            ers_deploy_mode: r.u8()?,                 // 41
            ers_harvested_this_lap_mguk: r.f32_le()?, // 42-45
            ers_harvested_this_lap_mguh: r.f32_le()?, // 46-49
            ers_deployed_this_lap: r.f32_le()?,       // 50-53
            network_paused: r.u8()?,                  // 54
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.u8(self.traction_control);
        w.u8(self.anti_lock_brakes);
        w.u8(self.fuel_mix);
        w.u8(self.front_brake_bias);
        w.u8(self.pit_limiter_status);
        w.f32_le(self.fuel_in_tank);
        w.f32_le(self.fuel_capacity);
        w.f32_le(self.fuel_remaining_laps);
        w.u16_le(self.max_rpm);
        w.u16_le(self.idle_rpm);
        w.u8(self.max_gears);
        w.u8(self.drs_allowed);
        w.u16_le(self.drs_activation_distance);
        w.u8(self.actual_tyre_compound);
        w.u8(self.visual_tyre_compound);
        w.u8(self.tyres_age_laps);
        w.i8(self.vehicle_fia_flags);
        w.f32_le(self.engine_power_ice);
        w.f32_le(self.engine_power_mguk);
        w.f32_le(self.ers_store_energy);
        w.u8(self.ers_deploy_mode);
        w.f32_le(self.ers_harvested_this_lap_mguk);
        w.f32_le(self.ers_harvested_this_lap_mguh);
        w.f32_le(self.ers_deployed_this_lap);
        w.u8(self.network_paused);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPacket {
    pub header: PacketHeader,
    pub data: SessionData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapDataPacket {
    pub header: PacketHeader,
    pub cars: Vec<LapData>,
    pub time_trial_pb_car_idx: u8,
    pub time_trial_rival_car_idx: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarTelemetryPacket {
    pub header: PacketHeader,
    pub cars: Vec<CarTelemetryData>,
    pub mfd_panel_index: u8,
    pub mfd_panel_index_secondary_player: u8,
    pub suggested_gear: i8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarStatusPacket {
    pub header: PacketHeader,
    pub cars: Vec<CarStatusData>,
}

impl LapDataPacket {
    pub fn car(&self, index: u8) -> Option<&LapData> {
        self.cars.get(usize::from(index))
    }
}

impl CarTelemetryPacket {
    pub fn car(&self, index: u8) -> Option<&CarTelemetryData> {
        self.cars.get(usize::from(index))
    }
}

impl CarStatusPacket {
    pub fn car(&self, index: u8) -> Option<&CarStatusData> {
        self.cars.get(usize::from(index))
    }
}

/// Decode one datagram.
pub fn decode(raw: &[u8]) -> Result<Packet, DecodeError> {
    let header = PacketHeader::decode(raw)?;
    if header.packet_format != PACKET_FORMAT {
        return Err(DecodeError::UnsupportedFormat {
            expected: PACKET_FORMAT,
            found: header.packet_format,
        });
    }

    match header.packet_id {
        PACKET_ID_SESSION => {
            require_len(raw, "session", SESSION_PACKET_SIZE)?;
            Ok(Packet::Session(SessionPacket { header, data: SessionData::decode(raw)? }))
        }
        PACKET_ID_LAP_DATA => {
            require_len(raw, "lap data", LAP_DATA_PACKET_SIZE)?;
            let mut r = ByteReader::at(raw, HEADER_SIZE);
            let cars = decode_cars(&mut r, LapData::decode)?;
            Ok(Packet::LapData(LapDataPacket {
                header,
                cars,
                time_trial_pb_car_idx: r.u8()?,
                time_trial_rival_car_idx: r.u8()?,
            }))
        }
        PACKET_ID_CAR_TELEMETRY => {
            require_len(raw, "car telemetry", CAR_TELEMETRY_PACKET_SIZE)?;
            let mut r = ByteReader::at(raw, HEADER_SIZE);
            let cars = decode_cars(&mut r, CarTelemetryData::decode)?;
            Ok(Packet::CarTelemetry(CarTelemetryPacket {
                header,
                cars,
                mfd_panel_index: r.u8()?,
                mfd_panel_index_secondary_player: r.u8()?,
                suggested_gear: r.i8()?,
            }))
        }
        PACKET_ID_CAR_STATUS => {
            require_len(raw, "car status", CAR_STATUS_PACKET_SIZE)?;
            let mut r = ByteReader::at(raw, HEADER_SIZE);
            let cars = decode_cars(&mut r, CarStatusData::decode)?;
            Ok(Packet::CarStatus(CarStatusPacket { header, cars }))
        }
        id if id <= MAX_PACKET_ID => Ok(Packet::Unknown(UnknownPacket { header })),
        packet_id => Err(DecodeError::UnknownPacketId { packet_id }),
    }
}

/// Encode a packet into the exact byte layout [`decode`] reads.
///
/// Per-car arrays are written as exactly [`NUM_CARS`] entries: missing cars
/// are zero-filled and surplus entries are dropped. Fields the decoder does
/// not read are written as zero.
pub fn encode(packet: &Packet) -> Vec<u8> {
    match packet {
        Packet::Session(p) => {
            let mut w = ByteWriter::with_capacity(SESSION_PACKET_SIZE);
            p.header.encode(&mut w);
            p.data.encode(&mut w);
            w.into_inner()
        }
        Packet::LapData(p) => {
            let mut w = ByteWriter::with_capacity(LAP_DATA_PACKET_SIZE);
            p.header.encode(&mut w);
            encode_cars(&mut w, &p.cars, LAP_DATA_ENTRY_SIZE, LapData::encode);
            w.u8(p.time_trial_pb_car_idx);
            w.u8(p.time_trial_rival_car_idx);
            w.into_inner()
        }
        Packet::CarTelemetry(p) => {
            let mut w = ByteWriter::with_capacity(CAR_TELEMETRY_PACKET_SIZE);
            p.header.encode(&mut w);
            encode_cars(&mut w, &p.cars, CAR_TELEMETRY_ENTRY_SIZE, CarTelemetryData::encode);
            w.u8(p.mfd_panel_index);
            w.u8(p.mfd_panel_index_secondary_player);
            w.i8(p.suggested_gear);
            w.into_inner()
        }
        Packet::CarStatus(p) => {
            let mut w = ByteWriter::with_capacity(CAR_STATUS_PACKET_SIZE);
            p.header.encode(&mut w);
            encode_cars(&mut w, &p.cars, CAR_STATUS_ENTRY_SIZE, CarStatusData::encode);
            w.into_inner()
        }
        Packet::Unknown(p) => {
            let mut w = ByteWriter::with_capacity(HEADER_SIZE);
            p.header.encode(&mut w);
            w.into_inner()
        }
    }
}

fn require_len(raw: &[u8], kind: &'static str, expected: usize) -> Result<(), DecodeError> {
    if raw.len() < expected {
        return Err(DecodeError::TooShort { kind, expected, actual: raw.len() });
    }
    Ok(())
}

fn decode_cars<T>(
    r: &mut ByteReader<'_>,
    decode_one: fn(&mut ByteReader<'_>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    (0..NUM_CARS).map(|_| decode_one(r)).collect()
}

fn encode_cars<T>(
    w: &mut ByteWriter,
    cars: &[T],
    entry_size: usize,
    encode_one: fn(&T, &mut ByteWriter),
) {
    for car in cars.iter().take(NUM_CARS) {
        encode_one(car, w);
    }
    let missing = NUM_CARS.saturating_sub(cars.len());
    w.zeros(missing * entry_size);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        car_status_packet, car_telemetry_packet, header, lap_data_packet, session_packet,
    };

    #[test]
    fn layout_sizes_match_published_packet_sizes() {
        assert_eq!(SESSION_PACKET_SIZE, 753);
        assert_eq!(LAP_DATA_PACKET_SIZE, 1285);
        assert_eq!(CAR_TELEMETRY_PACKET_SIZE, 1352);
        assert_eq!(CAR_STATUS_PACKET_SIZE, 1239);
    }

    #[test]
    fn encoded_packets_have_exact_layout_length() {
        assert_eq!(session_packet(1, 0.0, 5, 10).encode().len(), SESSION_PACKET_SIZE);
        assert_eq!(lap_data_packet(1, 0.0, 0, 1, 0).encode().len(), LAP_DATA_PACKET_SIZE);
        assert_eq!(car_telemetry_packet(1, 0.0, 0, 200).encode().len(), CAR_TELEMETRY_PACKET_SIZE);
        assert_eq!(car_status_packet(1, 0.0, 0, 10.0, 16).encode().len(), CAR_STATUS_PACKET_SIZE);
    }

    #[test]
    fn header_fields_sit_at_documented_offsets() -> Result<(), DecodeError> {
        let mut h = header(PACKET_ID_CAR_TELEMETRY, 0x0102_0304_0506_0708, 12.5, 3);
        h.frame_identifier = 77;
        let mut w = ByteWriter::default();
        h.encode(&mut w);
        let raw = w.into_inner();

        assert_eq!(raw.len(), HEADER_SIZE);
        assert_eq!(u16::from_le_bytes([raw[0], raw[1]]), PACKET_FORMAT);
        assert_eq!(raw[6], PACKET_ID_CAR_TELEMETRY);
        assert_eq!(raw[7], 0x08);
        assert_eq!(f32::from_le_bytes([raw[15], raw[16], raw[17], raw[18]]), 12.5);
        assert_eq!(raw[27], 3);
        assert_eq!(PacketHeader::decode(&raw)?, h);
        Ok(())
    }

    #[test]
    fn session_game_mode_and_track_are_read_from_fixed_offsets() -> Result<(), DecodeError> {
        let mut raw = session_packet(9, 1.0, 0, 0).encode();
        raw[HEADER_SIZE + 7] = 5; // trackId
        raw[HEADER_SIZE + 6] = 15; // sessionType
        raw[HEADER_SIZE + SESSION_GAME_MODE] = 4;

        match decode(&raw)? {
            Packet::Session(p) => {
                assert_eq!(p.data.track_id, 5);
                assert_eq!(p.data.session_type, 15);
                assert_eq!(p.data.game_mode, 4);
            }
            other => panic!("expected session packet, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn lap_data_current_lap_and_last_lap_offsets() -> Result<(), DecodeError> {
        let raw = lap_data_packet(9, 60.0, 2, 2, 58_000).encode();
        let entry = HEADER_SIZE + 2 * LAP_DATA_ENTRY_SIZE;
        assert_eq!(
            u32::from_le_bytes([raw[entry], raw[entry + 1], raw[entry + 2], raw[entry + 3]]),
            58_000
        );
        assert_eq!(raw[entry + 33], 2);
        Ok(())
    }

    #[test]
    fn short_buffers_are_rejected_per_kind() {
        let raw = car_status_packet(1, 0.0, 0, 10.0, 16).encode();
        match decode(&raw[..raw.len() - 1]) {
            Err(DecodeError::TooShort { kind, expected, actual }) => {
                assert_eq!(kind, "car status");
                assert_eq!(expected, CAR_STATUS_PACKET_SIZE);
                assert_eq!(actual, CAR_STATUS_PACKET_SIZE - 1);
            }
            other => panic!("expected TooShort, got {:?}", other),
        }
        assert!(matches!(decode(&raw[..10]), Err(DecodeError::TooShort { kind: "header", .. })));
    }

    #[test]
    fn other_format_years_are_rejected() {
        let mut raw = car_telemetry_packet(1, 0.0, 0, 100).encode();
        raw[0..2].copy_from_slice(&2023u16.to_le_bytes());
        assert!(matches!(
            decode(&raw),
            Err(DecodeError::UnsupportedFormat { expected: 2024, found: 2023 })
        ));
    }

    #[test]
    fn unconsumed_ids_decode_to_unknown_and_out_of_range_ids_fail() -> Result<(), DecodeError> {
        let mut w = ByteWriter::default();
        header(3, 42, 1.0, 0).encode(&mut w);
        w.zeros(16);
        let raw = w.into_inner();
        assert!(matches!(decode(&raw)?, Packet::Unknown(_)));

        let mut raw = raw;
        raw[6] = MAX_PACKET_ID + 1;
        assert!(matches!(
            decode(&raw),
            Err(DecodeError::UnknownPacketId { packet_id }) if packet_id == MAX_PACKET_ID + 1
        ));
        Ok(())
    }

    #[test]
    fn short_car_arrays_encode_zero_filled() -> Result<(), DecodeError> {
        let mut packet = car_telemetry_packet(1, 0.0, 0, 150);
        if let Packet::CarTelemetry(p) = &mut packet {
            p.cars.truncate(1);
        }
        let raw = packet.encode();
        assert_eq!(raw.len(), CAR_TELEMETRY_PACKET_SIZE);
        match decode(&raw)? {
            Packet::CarTelemetry(p) => {
                assert_eq!(p.cars.len(), NUM_CARS);
                assert_eq!(p.cars[0].speed, 150);
                assert_eq!(p.cars[1], CarTelemetryData::default());
            }
            other => panic!("expected car telemetry, got {:?}", other),
        }
        Ok(())
    }
}
