/// Image classification through the CPU, IMC and NPU paths.
///
/// Each image runs through all three engines in turn. Layer 2 needs the
/// hidden activations, so one pass is two bus programs: layer 1, then ReLU +
/// layer 2 + argmax once the host has the layer-1 reads. Phases are framed by
/// `@@START_<ENGINE>_<PHASE>` console markers and timed per image through the
/// cycle counter.
use super::kernels::{cpu_matvec, imc_matvec, npu_matvec, ImcPlan, NpuPlan};
use super::mlp::{argmax, Mlp};
use super::program::BusProgram;
use crate::bus::MemoryMap;
use crate::npu::ActivationMode;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
  Cpu,
  Imc,
  Npu,
}

impl Engine {
  pub const ALL: [Engine; 3] = [Engine::Cpu, Engine::Imc, Engine::Npu];

  /// Marker and table tag
  pub fn tag(&self) -> &'static str {
    match self {
      Engine::Cpu => "CPU",
      Engine::Imc => "IMC",
      Engine::Npu => "NPU",
    }
  }
}

/// Work the core does itself never touches the bus; it is charged as idle
/// ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CpuCost {
  /// Per multiply-accumulate
  pub mac_ticks: u32,
  /// Per element of bias/ReLU/requantize and of argmax
  pub op_ticks: u32,
}

impl Default for CpuCost {
  fn default() -> Self {
    Self {
      mac_ticks: 4,
      op_ticks: 3,
    }
  }
}

impl CpuCost {
  fn ticks(per: u32, count: usize) -> u32 {
    per.saturating_mul(u32::try_from(count).unwrap_or(u32::MAX))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineResult {
  pub engine: Engine,
  pub class: usize,
  pub logits: Vec<i32>,
  /// Cycle-counter ticks for the whole forward pass
  pub ticks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageResult {
  pub image: usize,
  pub label: usize,
  pub engines: Vec<EngineResult>,
}

impl ImageResult {
  pub fn engine(&self, engine: Engine) -> Option<&EngineResult> {
    self.engines.iter().find(|r| r.engine == engine)
  }

  /// Every engine predicted the same class
  pub fn agree(&self) -> bool {
    self.engines.windows(2).all(|w| w[0].class == w[1].class)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineSummary {
  pub engine: Engine,
  pub correct: usize,
  pub total: usize,
  pub avg_ticks: u64,
  /// Logits equal the CPU's for every image
  pub matches_cpu: bool,
}

/// One layer in flight and how to turn its reads into accumulators
enum Layer {
  Cpu(Vec<i32>),
  Imc(ImcPlan),
  Npu(NpuPlan),
}

impl Layer {
  fn read_count(&self) -> usize {
    match self {
      Layer::Cpu(_) => 0,
      Layer::Imc(plan) => plan.read_count(),
      Layer::Npu(plan) => plan.read_count(),
    }
  }

  fn finish(self, reads: &[u32]) -> Vec<i32> {
    match self {
      Layer::Cpu(acc) => acc,
      Layer::Imc(plan) => plan.finish(reads),
      Layer::Npu(plan) => plan.finish(reads),
    }
  }
}

/// Meaning of the reads of the program in flight
enum Pending {
  /// `[t0, layer-1 reads..]`
  Layer1(Layer),
  /// `[layer-2 reads.., t1]`
  Layer2 { layer: Layer, t0: u32 },
  Done,
}

fn marker(edge: &str, engine: Engine, phase: &str) -> String {
  format!("@@{}_{}_{}\n", edge, engine.tag(), phase)
}

pub struct InferenceSession {
  model: Mlp,
  images: Vec<Vec<u8>>,
  labels: Vec<usize>,

  map: MemoryMap,
  settle: u32,
  cost: CpuCost,

  image: usize,
  engine: usize,
  pending: Pending,
  current: Vec<EngineResult>,
  results: Vec<ImageResult>,
}

impl InferenceSession {
  pub fn new(
    model: Mlp,
    images: Vec<Vec<u8>>,
    labels: Vec<usize>,
    map: MemoryMap,
    settle: u32,
    cost: CpuCost,
  ) -> Self {
    assert_eq!(images.len(), labels.len());
    Self {
      model,
      images,
      labels,
      map,
      settle,
      cost,
      image: 0,
      engine: 0,
      pending: Pending::Done,
      current: Vec::new(),
      results: Vec::new(),
    }
  }

  /// Banner, table header and the first layer-1 program
  pub fn start(&mut self) -> BusProgram {
    let uart = self.map.uart;
    let mut program = BusProgram::new();
    program
      .print(uart, "CPU vs ReRAM IMC vs NPU inference\n")
      .print(uart, "Image | Label | CPU Ticks  | IMC Ticks  | NPU Ticks  | Match?\n")
      .print(uart, "@@START_TOTAL\n");
    if self.images.is_empty() {
      program.append(&self.summary_program());
    } else {
      let first = self.layer1();
      program.append(&first);
    }
    program
  }

  /// Consume the reads of the finished program, return the next one
  pub fn advance(&mut self, reads: &[u32]) -> Option<BusProgram> {
    match std::mem::replace(&mut self.pending, Pending::Done) {
      Pending::Layer1(layer) => {
        debug_assert_eq!(reads.len(), layer.read_count() + 1);
        let (t0, rest) = reads.split_first()?;
        let hidden = self.model.hidden(&layer.finish(rest));
        Some(self.layer2(*t0, hidden))
      }
      Pending::Layer2 { layer, t0 } => {
        debug_assert_eq!(reads.len(), layer.read_count() + 1);
        let (t1, rest) = reads.split_last()?;
        let logits = self.model.logits(&layer.finish(rest));
        self.current.push(EngineResult {
          engine: Engine::ALL[self.engine],
          class: argmax(&logits),
          logits,
          ticks: t1.wrapping_sub(t0),
        });
        self.engine += 1;
        if self.engine < Engine::ALL.len() {
          return Some(self.layer1());
        }
        Some(self.finish_image())
      }
      Pending::Done => None,
    }
  }

  pub fn is_done(&self) -> bool {
    matches!(self.pending, Pending::Done) && self.results.len() == self.images.len()
  }

  pub fn results(&self) -> &[ImageResult] {
    &self.results
  }

  /// Images fully classified so far
  pub fn progress(&self) -> (usize, usize) {
    (self.results.len(), self.images.len())
  }

  pub fn summary(&self) -> Vec<EngineSummary> {
    Engine::ALL
      .iter()
      .map(|engine| {
        let runs: Vec<(&ImageResult, &EngineResult)> =
          self.results.iter().filter_map(|img| img.engine(*engine).map(|r| (img, r))).collect();
        let ticks: u64 = runs.iter().map(|(_, r)| r.ticks as u64).sum();
        EngineSummary {
          engine: *engine,
          correct: runs.iter().filter(|(img, r)| r.class == img.label).count(),
          total: runs.len(),
          avg_ticks: ticks / runs.len().max(1) as u64,
          matches_cpu: runs
            .iter()
            .all(|(img, r)| img.engine(Engine::Cpu).map(|cpu| cpu.logits == r.logits).unwrap_or(false)),
        }
      })
      .collect()
  }

  fn run_layer(
    &self,
    program: &mut BusProgram,
    engine: Engine,
    weights: &[i8],
    rows: usize,
    cols: usize,
    input: &[u8],
    mode: ActivationMode,
  ) -> Layer {
    match engine {
      Engine::Cpu => {
        program.idle(CpuCost::ticks(self.cost.mac_ticks, rows * cols));
        Layer::Cpu(cpu_matvec(weights, rows, cols, input, mode))
      }
      // crossbar voltages are unsigned; hidden activations never exceed 127
      Engine::Imc => {
        let (tiles, plan) = imc_matvec(&self.map, weights, rows, cols, input, self.settle);
        program.append(&tiles);
        Layer::Imc(plan)
      }
      Engine::Npu => {
        let (tiles, plan) = npu_matvec(&self.map, weights, rows, cols, input, mode);
        program.append(&tiles);
        Layer::Npu(plan)
      }
    }
  }

  fn layer1(&mut self) -> BusProgram {
    let engine = Engine::ALL[self.engine];
    let uart = self.map.uart;
    let m = &self.model;

    let mut program = BusProgram::new();
    program.read(self.map.cycle_counter).print(uart, &marker("START", engine, "LAYER1"));
    let layer = self.run_layer(
      &mut program,
      engine,
      &m.w1,
      m.hidden_size,
      m.input_size,
      &self.images[self.image],
      ActivationMode::Unsigned,
    );
    program.print(uart, &marker("END", engine, "LAYER1"));

    self.pending = Pending::Layer1(layer);
    program
  }

  fn layer2(&mut self, t0: u32, hidden: Vec<u8>) -> BusProgram {
    let engine = Engine::ALL[self.engine];
    let uart = self.map.uart;
    let m = &self.model;
    let op_ticks = self.cost.op_ticks;

    let mut program = BusProgram::new();
    program
      .print(uart, &marker("START", engine, "RELU"))
      .idle(CpuCost::ticks(op_ticks, m.hidden_size))
      .print(uart, &marker("END", engine, "RELU"))
      .print(uart, &marker("START", engine, "LAYER2"));
    let layer = self.run_layer(
      &mut program,
      engine,
      &m.w2,
      m.output_size,
      m.hidden_size,
      &hidden,
      ActivationMode::Signed,
    );
    program
      .print(uart, &marker("END", engine, "LAYER2"))
      .print(uart, &marker("START", engine, "ARGMAX"))
      .idle(CpuCost::ticks(op_ticks, m.output_size))
      .print(uart, &marker("END", engine, "ARGMAX"))
      .read(self.map.cycle_counter);

    self.pending = Pending::Layer2 { layer, t0 };
    program
  }

  /// Table row for the finished image, then the next image or the summary
  fn finish_image(&mut self) -> BusProgram {
    let result = ImageResult {
      image: self.image,
      label: self.labels[self.image],
      engines: std::mem::take(&mut self.current),
    };
    let ticks = |e: Engine| result.engine(e).map(|r| r.ticks).unwrap_or(0);
    let row = format!(
      "  {:<3} | {:<5} | {:<10} | {:<10} | {:<10} | {}\n",
      result.image,
      result.label,
      ticks(Engine::Cpu),
      ticks(Engine::Imc),
      ticks(Engine::Npu),
      if result.agree() { "YES" } else { "NO" }
    );
    self.results.push(result);
    self.image += 1;
    self.engine = 0;

    let mut program = BusProgram::new();
    program.print(self.map.uart, &row);
    let next = if self.image < self.images.len() {
      self.layer1()
    } else {
      self.summary_program()
    };
    program.append(&next);
    program
  }

  fn summary_program(&self) -> BusProgram {
    let uart = self.map.uart;
    let mut program = BusProgram::new();
    program.print(uart, "RESULTS:\n");
    for s in self.summary() {
      program
        .print(uart, &format!("  {} Accuracy: {}/{}\n", s.engine.tag(), s.correct, s.total))
        .print(uart, &format!("  Avg {} Ticks: {}\n", s.engine.tag(), s.avg_ticks));
    }
    program.print(uart, "@@END_TOTAL\n");
    program
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::Host;
  use crate::imc::ExactCrossbar;
  use crate::top::Top;

  fn model() -> Mlp {
    Mlp {
      input_size: 3,
      hidden_size: 2,
      output_size: 2,
      w1: vec![1, 2, 3, -1, -2, -3],
      b1: vec![0, 100],
      w2: vec![1, 0, 0, 1],
      b2: vec![0, 0],
      h_div: 1,
    }
  }

  fn drive(session: &mut InferenceSession) -> u64 {
    let mut top = Top::new("top", 0x1_0000, MemoryMap::default(), ExactCrossbar::new());
    let mut host = Host::new(session.start());
    loop {
      let req = host.drive();
      let out = top.tick(req, None);
      host.observe(&out.resp);
      if host.is_done() {
        match session.advance(host.reads()) {
          Some(next) => host = Host::new(next),
          None => break,
        }
      }
    }
    top.ticks()
  }

  #[test]
  fn test_all_engines_agree() {
    let images = vec![vec![10, 20, 30], vec![0, 0, 1]];
    let mut session = InferenceSession::new(
      model(),
      images,
      vec![0, 1],
      MemoryMap::default(),
      2,
      CpuCost::default(),
    );
    drive(&mut session);
    assert!(session.is_done());

    let results = session.results();
    assert_eq!(results.len(), 2);
    // hidden = [140 -> 127, 0]; logits = [127, 0]
    assert_eq!(results[0].engine(Engine::Cpu).map(|r| r.class), Some(0));
    // hidden = [3, 97]
    assert_eq!(results[1].engine(Engine::Cpu).map(|r| r.logits.clone()), Some(vec![3, 97]));
    assert!(results.iter().all(|r| r.agree()));

    for s in session.summary() {
      assert_eq!(s.total, 2);
      assert_eq!(s.correct, 2);
      assert!(s.matches_cpu);
      assert!(s.avg_ticks > 0);
    }
  }

  #[test]
  fn test_cpu_cost_scales_cpu_ticks() {
    let run = |mac_ticks| {
      let mut session = InferenceSession::new(
        model(),
        vec![vec![1, 1, 1]],
        vec![0],
        MemoryMap::default(),
        2,
        CpuCost { mac_ticks, op_ticks: 1 },
      );
      drive(&mut session);
      session.results()[0].engine(Engine::Cpu).map(|r| r.ticks).unwrap()
    };
    // 6 + 4 MACs per image
    assert_eq!(run(11) - run(1), 10 * 10);
  }

  #[test]
  fn test_no_images() {
    let mut session = InferenceSession::new(model(), vec![], vec![], MemoryMap::default(), 2, CpuCost::default());
    drive(&mut session);
    assert!(session.is_done());
    assert!(session.summary().iter().all(|s| s.total == 0));
  }
}
