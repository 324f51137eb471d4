use sandpile_core::{Boundary, CascadeTracker, Lattice};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct Sandpile {
    inner: Lattice,
    cascade: Option<CascadeTracker>,
}

#[wasm_bindgen]
impl Sandpile {
    #[wasm_bindgen(constructor)]
    pub fn new(rows: usize, cols: usize, periodic: bool, threshold: i32) -> Result<Sandpile, JsValue> {
        let boundary = if periodic { Boundary::Periodic } else { Boundary::Fixed };
        let inner = Lattice::new(rows, cols, boundary, threshold as i64)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Sandpile { inner, cascade: None })
    }

    pub fn rows(&self) -> usize { self.inner.rows() }
    pub fn cols(&self) -> usize { self.inner.cols() }
    pub fn threshold(&self) -> i32 { self.inner.threshold() as i32 }

    // Editing
    pub fn clear(&mut self) {
        self.inner.clear();
        self.cascade = None;
    }
    pub fn add_grains(&mut self, row: usize, col: usize, amount: i32) -> Result<(), JsValue> {
        self.inner
            .add(row, col, amount as i64)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
    pub fn set_cell(&mut self, row: usize, col: usize, value: i32) -> Result<(), JsValue> {
        self.inner
            .set(row, col, value as i64)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    // Copy-based JS access (reliable)
    pub fn heights(&self) -> Vec<i32> {
        self.inner.heights().iter().map(|&h| h as i32).collect()
    }
    pub fn mass(&self) -> f64 { self.inner.mass() as f64 }
    pub fn is_stable(&self) -> bool { self.inner.is_stable() }

    // Step + timing (WASM-only)
    pub fn step(&mut self) -> StepInfo {
        let t0 = now_ms();
        let active = self.inner.step();
        let t1 = now_ms();
        StepInfo { active, topples: self.inner.last_topples() as u32, compute_ms: t1 - t0 }
    }
    pub fn relax(&mut self, max_steps: u32) -> RelaxInfo {
        let t0 = now_ms();
        let r = self.inner.relax(max_steps as u64);
        let t1 = now_ms();
        RelaxInfo { stable: r.is_stable(), steps: r.steps() as u32, compute_ms: t1 - t0 }
    }

    // Cascade animation: one wave per frame
    pub fn begin_cascade(&mut self) {
        self.cascade = Some(CascadeTracker::new(&self.inner));
    }
    pub fn cascade_step(&mut self) -> StepInfo {
        let info = self.step();
        if let Some(tracker) = self.cascade.as_mut() {
            tracker.observe(&self.inner, info.active);
        }
        info
    }
    pub fn cascade_mask(&self) -> Vec<u8> {
        match &self.cascade {
            Some(tracker) => tracker.affected().iter().map(|&a| a as u8).collect(),
            None => vec![0; self.inner.len()],
        }
    }
    pub fn cascade_size(&self) -> usize {
        self.cascade.as_ref().map_or(0, |t| t.size())
    }
    pub fn cascade_duration(&self) -> u32 {
        self.cascade.as_ref().map_or(0, |t| t.waves() as u32)
    }
}

#[wasm_bindgen]
pub struct StepInfo {
    active: bool,
    topples: u32,
    compute_ms: f64,
}

#[wasm_bindgen]
impl StepInfo {
    pub fn active(&self) -> bool { self.active }
    pub fn topples(&self) -> u32 { self.topples }
    pub fn compute_ms(&self) -> f64 { self.compute_ms }
}

#[wasm_bindgen]
pub struct RelaxInfo {
    stable: bool,
    steps: u32,
    compute_ms: f64,
}

#[wasm_bindgen]
impl RelaxInfo {
    pub fn stable(&self) -> bool { self.stable }
    pub fn steps(&self) -> u32 { self.steps }
    pub fn compute_ms(&self) -> f64 { self.compute_ms }
}


fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}
