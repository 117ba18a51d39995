//! Quantized merge of the telemetry and status streams.
//!
//! Packet session times are snapped to a fixed tick grid. Car telemetry
//! supplies the dense fields of a tick; car status supplies the sparse ones,
//! which carry forward until the next status reading. One sample is emitted
//! per tick that has speed or rpm.

use std::collections::BTreeMap;

use tracing::debug;

use crate::archive::RawPacket;
use crate::protocol::{CarStatusData, CarTelemetryData, Packet};
use crate::types::{Lap, TelemetrySample};

/// Grid resolution used when nothing else is configured.
pub const DEFAULT_TICKS_PER_SECOND: u32 = 50;

/// Lap number to the forward-filled compounds of its samples, in tick order.
pub type CompoundObservations = BTreeMap<u16, Vec<u8>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ResampleOutput {
    pub samples: Vec<TelemetrySample>,
    pub compounds: CompoundObservations,
}

#[derive(Debug, Default, Clone, Copy)]
struct Dense {
    speed: Option<u16>,
    throttle: Option<f32>,
    brake: Option<f32>,
    gear: Option<i8>,
    rpm: Option<u16>,
    drs: Option<bool>,
}

impl Dense {
    fn merge(&mut self, car: &CarTelemetryData) {
        self.speed = Some(car.speed);
        self.throttle = Some(car.throttle);
        self.brake = Some(car.brake);
        self.gear = Some(car.gear);
        self.rpm = Some(car.engine_rpm);
        self.drs = Some(car.drs != 0);
    }

    fn has_motion(&self) -> bool {
        self.speed.is_some() || self.rpm.is_some()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Sparse {
    fuel_in_tank: Option<f32>,
    compound: Option<u8>,
    ers_store_energy: Option<f32>,
    ers_deploy_mode: Option<u8>,
}

impl Sparse {
    fn merge(&mut self, car: &CarStatusData) {
        self.fuel_in_tank = Some(car.fuel_in_tank);
        self.compound = Some(car.actual_tyre_compound);
        self.ers_store_energy = Some(car.ers_store_energy);
        self.ers_deploy_mode = Some(car.ers_deploy_mode);
    }

    /// Fields present here win; absent ones inherit from `prior`.
    fn fill_from(self, prior: Sparse) -> Sparse {
        Sparse {
            fuel_in_tank: self.fuel_in_tank.or(prior.fuel_in_tank),
            compound: self.compound.or(prior.compound),
            ers_store_energy: self.ers_store_energy.or(prior.ers_store_energy),
            ers_deploy_mode: self.ers_deploy_mode.or(prior.ers_deploy_mode),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    dense: Dense,
    sparse: Sparse,
}

/// Builds the quantized telemetry timeline of one session.
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    ticks_per_second: u32,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_PER_SECOND)
    }
}

impl Resampler {
    /// A zero rate is raised to one tick per second.
    pub fn new(ticks_per_second: u32) -> Self {
        Self { ticks_per_second: ticks_per_second.max(1) }
    }

    pub fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }

    /// Grid index nearest to `session_time`.
    pub fn tick_of(&self, session_time: f64) -> i64 {
        (session_time * f64::from(self.ticks_per_second)).round() as i64
    }

    /// Session time of a grid index.
    pub fn tick_time(&self, tick: i64) -> f64 {
        tick as f64 / f64::from(self.ticks_per_second)
    }

    /// Merge the player's telemetry and status packets into samples.
    ///
    /// `packets` must be ordered by session time; within one tick a later
    /// packet overwrites the fields an earlier one set.
    pub fn resample(
        &self,
        session_id: u64,
        player_index: u8,
        packets: &[RawPacket],
        laps: &[Lap],
    ) -> ResampleOutput {
        let slots = self.collect_slots(player_index, packets);

        let mut intervals: Vec<&Lap> = laps.iter().collect();
        intervals.sort_by_key(|lap| lap.number);

        let mut samples = Vec::with_capacity(slots.len());
        let mut compounds = CompoundObservations::new();
        let mut carried = Sparse::default();

        for (tick, slot) in slots {
            carried = slot.sparse.fill_from(carried);
            if !slot.dense.has_motion() {
                continue;
            }

            let session_time = self.tick_time(tick);
            let lap = intervals.iter().find(|lap| lap.contains(session_time));
            let lap_time = lap.map_or(session_time, |lap| session_time - lap.start);

            if let (Some(lap), Some(compound)) = (lap, carried.compound) {
                compounds.entry(lap.number).or_default().push(compound);
            }

            samples.push(TelemetrySample {
                session_id,
                lap: lap.map(|lap| lap.number),
                session_time,
                lap_time,
                speed: slot.dense.speed,
                throttle: slot.dense.throttle,
                brake: slot.dense.brake,
                gear: slot.dense.gear,
                rpm: slot.dense.rpm,
                drs: slot.dense.drs,
                fuel_in_tank: carried.fuel_in_tank,
                ers_store_energy: carried.ers_store_energy,
                ers_deploy_mode: carried.ers_deploy_mode,
            });
        }

        debug!(
            session_id,
            samples = samples.len(),
            attributed = samples.iter().filter(|s| s.lap.is_some()).count(),
            "Resampled telemetry"
        );
        ResampleOutput { samples, compounds }
    }

    fn collect_slots(&self, player_index: u8, packets: &[RawPacket]) -> BTreeMap<i64, Slot> {
        let mut slots: BTreeMap<i64, Slot> = BTreeMap::new();
        for raw in packets {
            match &raw.packet {
                Packet::CarTelemetry(packet) => {
                    if let Some(car) = packet.car(player_index) {
                        slots.entry(self.tick_of(raw.session_time)).or_default().dense.merge(car);
                    }
                }
                Packet::CarStatus(packet) => {
                    if let Some(car) = packet.car(player_index) {
                        slots.entry(self.tick_of(raw.session_time)).or_default().sparse.merge(car);
                    }
                }
                _ => {}
            }
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{car_status_packet, car_telemetry_packet, lap_data_packet};
    use proptest::prelude::*;

    fn raw(packet: Packet) -> RawPacket {
        RawPacket::from_packet(packet)
    }

    fn lap(number: u16, start: f64, end: f64) -> Lap {
        Lap {
            session_id: 1,
            number,
            duration_ms: ((end - start) * 1000.0) as u32,
            start,
            end,
            compound: None,
        }
    }

    #[test]
    fn ticks_snap_to_the_grid() {
        let resampler = Resampler::default();
        assert_eq!(resampler.tick_of(2.0), 100);
        assert_eq!(resampler.tick_of(2.009), 100);
        assert_eq!(resampler.tick_of(2.011), 101);
        assert_eq!(resampler.tick_time(100), 2.0);
        assert_eq!(Resampler::new(0).ticks_per_second(), 1);
    }

    #[test]
    fn sparse_fields_forward_fill() {
        let packets = vec![
            raw(car_status_packet(1, 1.00, 0, 50.0, 16)),
            raw(car_telemetry_packet(1, 1.00, 0, 100)),
            raw(car_telemetry_packet(1, 1.02, 0, 101)),
            raw(car_status_packet(1, 1.04, 0, 45.0, 16)),
            raw(car_telemetry_packet(1, 1.04, 0, 102)),
        ];
        let out = Resampler::default().resample(1, 0, &packets, &[]);
        let fuel: Vec<Option<f32>> = out.samples.iter().map(|s| s.fuel_in_tank).collect();
        assert_eq!(fuel, vec![Some(50.0), Some(50.0), Some(45.0)]);
    }

    #[test]
    fn sparse_fields_stay_null_without_prior_reading() {
        let packets = vec![
            raw(car_telemetry_packet(1, 0.0, 0, 100)),
            raw(car_status_packet(1, 0.1, 0, 30.0, 17)),
            raw(car_telemetry_packet(1, 0.2, 0, 100)),
        ];
        let out = Resampler::default().resample(1, 0, &packets, &[]);
        assert_eq!(out.samples.len(), 2);
        assert_eq!(out.samples[0].fuel_in_tank, None);
        assert_eq!(out.samples[1].fuel_in_tank, Some(30.0));
    }

    #[test]
    fn same_tick_packets_merge_and_later_wins() {
        let packets = vec![
            raw(car_telemetry_packet(1, 3.000, 0, 120)),
            raw(car_telemetry_packet(1, 3.004, 0, 125)),
            raw(car_status_packet(1, 3.006, 0, 20.0, 18)),
        ];
        let out = Resampler::default().resample(1, 0, &packets, &[]);
        assert_eq!(out.samples.len(), 1);
        assert_eq!(out.samples[0].speed, Some(125));
        assert_eq!(out.samples[0].fuel_in_tank, Some(20.0));
        assert_eq!(out.samples[0].session_time, 3.0);
    }

    #[test]
    fn status_only_ticks_emit_nothing() {
        let packets = vec![
            raw(car_status_packet(1, 1.0, 0, 50.0, 16)),
            raw(lap_data_packet(1, 1.5, 0, 1, 0)),
        ];
        let out = Resampler::default().resample(1, 0, &packets, &[]);
        assert!(out.samples.is_empty());
        assert!(out.compounds.is_empty());
    }

    #[test]
    fn attribution_uses_half_open_intervals() {
        let packets: Vec<RawPacket> = [9.98f32, 10.0, 20.0]
            .iter()
            .map(|t| raw(car_telemetry_packet(1, *t, 0, 200)))
            .collect();
        let laps = vec![lap(2, 10.0, 20.0), lap(1, 0.0, 10.0)];
        let out = Resampler::default().resample(1, 0, &packets, &laps);

        let laps: Vec<Option<u16>> = out.samples.iter().map(|s| s.lap).collect();
        assert_eq!(laps, vec![Some(1), Some(2), None]);
        assert!((out.samples[0].lap_time - 9.98).abs() < 1e-9);
        assert_eq!(out.samples[1].lap_time, 0.0);
        assert_eq!(out.samples[2].lap_time, 20.0);
    }

    #[test]
    fn compounds_are_recorded_per_attributed_sample() {
        let packets = vec![
            raw(car_status_packet(1, 0.0, 0, 50.0, 16)),
            raw(car_telemetry_packet(1, 0.0, 0, 100)),
            raw(car_telemetry_packet(1, 0.02, 0, 100)),
            raw(car_status_packet(1, 0.04, 0, 49.0, 17)),
            raw(car_telemetry_packet(1, 0.04, 0, 100)),
            raw(car_telemetry_packet(1, 5.0, 0, 100)),
        ];
        let out = Resampler::default().resample(1, 0, &packets, &[lap(1, 0.0, 1.0)]);
        assert_eq!(out.compounds.get(&1), Some(&vec![16, 16, 17]));
        assert_eq!(out.compounds.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_attributed_samples_lie_inside_their_lap(
            times in prop::collection::vec(0.0f32..300.0, 1..300),
            bounds in prop::collection::vec(1.0f64..60.0, 1..6),
        ) {
            let mut laps = Vec::new();
            let mut start = 0.0;
            for (i, len) in bounds.iter().enumerate() {
                laps.push(lap(i as u16 + 1, start, start + len));
                start += len;
            }
            let mut packets: Vec<RawPacket> =
                times.iter().map(|t| raw(car_telemetry_packet(1, *t, 0, 150))).collect();
            packets.sort_by(|a, b| a.session_time.total_cmp(&b.session_time));

            let out = Resampler::default().resample(1, 0, &packets, &laps);
            let mut ticks: Vec<f64> = Vec::new();
            for sample in &out.samples {
                if let Some(number) = sample.lap {
                    let lap = laps.iter().find(|l| l.number == number);
                    prop_assert!(lap.is_some_and(|l| l.contains(sample.session_time)));
                }
                ticks.push(sample.session_time);
            }
            let mut deduped = ticks.clone();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), ticks.len());
        }
    }
}
