use imcsim::bus::MemoryMap;
use imcsim::host::{cpu_matvec, imc_matvec, npu_matvec, BusProgram, Host};
use imcsim::imc::{Crossbar, ExactCrossbar};
use imcsim::npu::ActivationMode;
use imcsim::Top;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Run `program` to completion and return its reads
fn execute<X: Crossbar>(top: &mut Top<X>, program: BusProgram) -> Vec<u32> {
  let mut host = Host::new(program);
  let mut budget = 1_000_000;
  while !host.is_done() {
    let req = host.drive();
    let out = top.tick(req, None);
    host.observe(&out.resp);
    budget -= 1;
    assert!(budget > 0, "host program did not finish");
  }
  host.reads().to_vec()
}

fn random_case(rng: &mut StdRng, rows: usize, cols: usize) -> (Vec<i8>, Vec<u8>) {
  let weights = (0..rows * cols).map(|_| rng.gen::<i8>()).collect();
  let input = (0..cols).map(|_| rng.gen::<u8>()).collect();
  (weights, input)
}

#[test]
fn tiled_imc_matches_cpu() {
  let map = MemoryMap::default();
  let mut rng = StdRng::seed_from_u64(0x1_3c);
  for (rows, cols) in [(1, 1), (8, 8), (3, 11), (10, 17), (16, 9)] {
    let (weights, input) = random_case(&mut rng, rows, cols);
    let mut top = Top::new("top", 0x1_0000, map, ExactCrossbar::new());
    let (program, plan) = imc_matvec(&map, &weights, rows, cols, &input, 2);
    let reads = execute(&mut top, program);
    assert_eq!(
      plan.finish(&reads),
      cpu_matvec(&weights, rows, cols, &input, ActivationMode::Unsigned),
      "{}x{}",
      rows,
      cols
    );
  }
}

#[test]
fn tiled_imc_without_settle_ticks() {
  let map = MemoryMap::default();
  let mut rng = StdRng::seed_from_u64(7);
  let (weights, input) = random_case(&mut rng, 5, 13);
  let mut top = Top::new("top", 0x1_0000, map, ExactCrossbar::new());
  let (program, plan) = imc_matvec(&map, &weights, 5, 13, &input, 0);
  let reads = execute(&mut top, program);
  assert_eq!(plan.finish(&reads), cpu_matvec(&weights, 5, 13, &input, ActivationMode::Unsigned));
}

#[test]
fn tiled_npu_matches_cpu() {
  let map = MemoryMap::default();
  let mut rng = StdRng::seed_from_u64(42);
  for mode in [ActivationMode::Unsigned, ActivationMode::Signed] {
    for (rows, cols) in [(1, 1), (8, 8), (3, 11), (10, 17), (16, 24)] {
      let (weights, input) = random_case(&mut rng, rows, cols);
      let mut top = Top::new("top", 0x1_0000, map, ExactCrossbar::new());
      let (program, plan) = npu_matvec(&map, &weights, rows, cols, &input, mode);
      let reads = execute(&mut top, program);
      assert_eq!(
        plan.finish(&reads),
        cpu_matvec(&weights, rows, cols, &input, mode),
        "{}x{} {:?}",
        rows,
        cols,
        mode
      );
    }
  }
}

#[test]
fn kernels_follow_a_relocated_map() {
  let map = MemoryMap {
    npu_base: 0x1000,
    imc_base: 0x2000,
    ..MemoryMap::default()
  };
  let weights = [3i8, -1, 2, 7, -8, 0];
  let input = [4u8, 5, 6];
  let expected = cpu_matvec(&weights, 2, 3, &input, ActivationMode::Unsigned);

  let mut top = Top::new("top", 0x1_0000, map, ExactCrossbar::new());
  let (program, plan) = imc_matvec(&map, &weights, 2, 3, &input, 1);
  assert_eq!(plan.finish(&execute(&mut top, program)), expected);

  let (program, plan) = npu_matvec(&map, &weights, 2, 3, &input, ActivationMode::Unsigned);
  assert_eq!(plan.finish(&execute(&mut top, program)), expected);
}
