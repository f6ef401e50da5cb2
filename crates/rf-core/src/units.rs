// rf-core/src/units.rs

use uom::si::f64::{
    Pressure as UomPressure, Ratio as UomRatio, Time as UomTime, Volume as UomVolume,
    VolumeRate as UomVolumeRate,
};

// Public canonical unit types (SI, f64)
pub type Pressure = UomPressure;
pub type Ratio = UomRatio;
pub type Time = UomTime;
pub type Volume = UomVolume;
pub type VolumeRate = UomVolumeRate;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn bar(v: f64) -> Pressure {
    use uom::si::pressure::bar;
    Pressure::new::<bar>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn days(v: f64) -> Time {
    use uom::si::time::day;
    Time::new::<day>(v)
}

#[inline]
pub fn m3(v: f64) -> Volume {
    use uom::si::volume::cubic_meter;
    Volume::new::<cubic_meter>(v)
}

/// Surface volume rate given in m³ per day.
#[inline]
pub fn m3_per_day(v: f64) -> VolumeRate {
    m3(v) / days(1.0)
}

#[inline]
pub fn unitless(v: f64) -> Ratio {
    use uom::si::ratio::ratio;
    Ratio::new::<ratio>(v)
}

/// Per-bar compressibility expressed per pascal.
#[inline]
pub fn per_bar(v: f64) -> f64 {
    v / bar(1.0).value
}

#[inline]
pub fn to_days(t: Time) -> f64 {
    use uom::si::time::day;
    t.get::<day>()
}

#[inline]
pub fn to_bar(p: Pressure) -> f64 {
    use uom::si::pressure::bar;
    p.get::<bar>()
}

#[inline]
pub fn to_m3_per_day(q: VolumeRate) -> f64 {
    q.value * days(1.0).value
}
