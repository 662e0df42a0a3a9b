pub mod gain;
pub mod level;

use serde::Serialize;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use crate::dsp::buffer::{StereoBuffer, Window};
use crate::dsp::eq::BANDS;
use crate::dsp::filter::measure_band;

/// One independent unit of analysis work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisUnit {
    LeftRms,
    RightRms,
    Band(usize),
}

impl AnalysisUnit {
    pub fn all() -> Vec<AnalysisUnit> {
        let mut units = vec![AnalysisUnit::LeftRms, AnalysisUnit::RightRms];
        units.extend((0..BANDS.len()).map(AnalysisUnit::Band));
        units
    }

    fn run(self, buf: &StereoBuffer, win: Window) -> f32 {
        match self {
            AnalysisUnit::LeftRms => level::channel_rms(&buf.left[win.range()]),
            AnalysisUnit::RightRms => level::channel_rms(&buf.right[win.range()]),
            AnalysisUnit::Band(i) => {
                let band = &BANDS[i];
                measure_band(&buf.left, win, band.center_hz, band.q)
            }
        }
    }

    fn label(self) -> String {
        match self {
            AnalysisUnit::LeftRms => "left RMS".into(),
            AnalysisUnit::RightRms => "right RMS".into(),
            AnalysisUnit::Band(i) => format!("band {}Hz", BANDS[i].center_hz),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Completed,
    /// Missed the join deadline; the slot kept its default value
    TimedOut,
}

#[derive(Clone, Debug, Serialize)]
pub struct UnitReport {
    pub unit: AnalysisUnit,
    pub status: UnitStatus,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisResult {
    pub left_rms: f32,
    pub right_rms: f32,
    pub band_rms: [f32; BANDS.len()],
    pub overall_gain: f32,
    pub band_multipliers: [f32; BANDS.len()],
    pub units: Vec<UnitReport>,
}

impl AnalysisResult {
    pub fn timed_out(&self) -> Vec<AnalysisUnit> {
        self.units
            .iter()
            .filter(|u| u.status == UnitStatus::TimedOut)
            .map(|u| u.unit)
            .collect()
    }

    pub fn timed_out_labels(&self) -> Vec<String> {
        self.timed_out().into_iter().map(AnalysisUnit::label).collect()
    }
}

/// Raw measurements collected by the fork-join phase.
#[derive(Clone, Debug, Default)]
pub struct Measurements {
    pub left_rms: f32,
    pub right_rms: f32,
    pub band_rms: [f32; BANDS.len()],
    pub units: Vec<UnitReport>,
}

impl Measurements {
    fn store(&mut self, unit: AnalysisUnit, value: f32) {
        match unit {
            AnalysisUnit::LeftRms => self.left_rms = value,
            AnalysisUnit::RightRms => self.right_rms = value,
            AnalysisUnit::Band(i) => self.band_rms[i] = value,
        }
    }
}

/// Run every analysis unit on the rayon pool against a shared read-only
/// buffer and join them under one deadline.
///
/// Units still running at the deadline are abandoned, not cancelled; their
/// slots keep the default of zero and are reported as `TimedOut`.
pub fn measure(buf: &Arc<StereoBuffer>, win: Window, timeout: Duration) -> Measurements {
    let units = AnalysisUnit::all();
    let (tx, rx) = mpsc::channel::<(AnalysisUnit, f32)>();

    for &unit in &units {
        let tx = tx.clone();
        let buf = Arc::clone(buf);
        rayon::spawn(move || {
            let value = unit.run(&buf, win);
            // Release the buffer before reporting so a full join leaves it unshared
            drop(buf);
            log::debug!("Analysis unit {} = {:.6}", unit.label(), value);
            // The collector may have given up already
            let _ = tx.send((unit, value));
        });
    }
    drop(tx);

    let deadline = Instant::now() + timeout;
    let mut out = Measurements::default();
    let mut done = Vec::with_capacity(units.len());

    while done.len() < units.len() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((unit, value)) => {
                out.store(unit, value);
                done.push(unit);
            }
            Err(_) => break,
        }
    }

    out.units = units
        .into_iter()
        .map(|unit| {
            let status = if done.contains(&unit) {
                UnitStatus::Completed
            } else {
                log::warn!("Analysis unit {} timed out, using default value", unit.label());
                UnitStatus::TimedOut
            };
            UnitReport { unit, status }
        })
        .collect();

    out
}

/// Measure, then derive target gain and band multipliers.
pub fn analyze(buf: &Arc<StereoBuffer>, win: Window, timeout: Duration, target_rms_db: f32) -> AnalysisResult {
    log::info!(
        "Analyzing samples {}..{} ({} units in parallel)",
        win.start,
        win.end,
        AnalysisUnit::all().len()
    );
    let m = measure(buf, win, timeout);
    log::info!("RMS left={:.5} right={:.5}", m.left_rms, m.right_rms);

    let overall_gain = gain::overall_gain(m.left_rms, m.right_rms, target_rms_db);
    let band_multipliers = gain::band_multipliers(m.left_rms, m.right_rms, &m.band_rms);

    AnalysisResult {
        left_rms: m.left_rms,
        right_rms: m.right_rms,
        band_rms: m.band_rms,
        overall_gain,
        band_multipliers,
        units: m.units,
    }
}
