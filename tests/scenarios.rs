use imcsim::bus::{BusReq, MemoryMap};
use imcsim::imc::controller::{PROG_ADDR, PROG_DATA, RESULT as IMC_RESULT, V_INPUT_HI, V_INPUT_LO};
use imcsim::imc::{ExactCrossbar, DIM};
use imcsim::npu::regs::{ACT, CTRL, CTRL_START, RESULT as NPU_RESULT, WEIGHT};
use imcsim::Top;

fn top_with(map: MemoryMap) -> Top<ExactCrossbar> {
  Top::new("top", 0x1_0000, map, ExactCrossbar::new())
}

fn top() -> Top<ExactCrossbar> {
  top_with(MemoryMap::default())
}

#[test]
fn scenario_a_identity_crossbar() {
  let mut top = top();
  let map = *top.map();
  for r in 0..DIM {
    for c in 0..DIM {
      top.write(map.imc_reg(PROG_DATA), if r == c { 255 } else { 0 });
      top.write(map.imc_reg(PROG_ADDR), (r * DIM + c) as u32);
    }
  }
  assert_eq!(top.imc.programmed(), 64);

  top.write(map.imc_reg(V_INPUT_LO), u32::from_le_bytes([1, 2, 3, 4]));
  top.write(map.imc_reg(V_INPUT_HI), u32::from_le_bytes([5, 6, 7, 8]));

  let rows: Vec<u32> = (0..DIM as u32).map(|i| top.read(map.imc_reg(IMC_RESULT + 4 * i))).collect();
  assert_eq!(rows, (1..=8).map(|v| 255 * v).collect::<Vec<u32>>());
}

#[test]
fn scenario_b_identity_mac() {
  let mut top = top();
  let map = *top.map();
  let mut weights = [0u8; 64];
  for r in 0..DIM {
    weights[r * DIM + r] = 1;
  }
  for (k, w) in weights.chunks_exact(4).enumerate() {
    top.write(map.npu_reg(WEIGHT + 4 * k as u32), u32::from_le_bytes([w[0], w[1], w[2], w[3]]));
  }
  top.write(map.npu_reg(ACT), u32::from_le_bytes([5, 3, 0, 0]));
  top.write(map.npu_reg(ACT + 4), 0);
  top.write(map.npu_reg(CTRL), CTRL_START);

  let rows: Vec<u32> = (0..DIM as u32).map(|r| top.read(map.npu_reg(NPU_RESULT + 4 * r))).collect();
  assert_eq!(rows, vec![5, 3, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn scenario_c_memory_word() {
  let mut top = top();
  top.write(0x1000, 0xaabb_ccdd);
  assert_eq!(top.read(0x1000), 0xaabb_ccdd);
}

#[test]
fn scenario_d_unmapped_imc_offset() {
  let map = MemoryMap {
    imc_size: 0x40,
    ..MemoryMap::default()
  };
  let mut top = top_with(map);

  let out = top.tick(Some(BusReq::read(map.imc_reg(0x38))), None);
  assert!(out.resp.grant);
  assert!(!out.resp.valid);
  let out = top.tick(None, None);
  assert!(out.resp.valid);
  assert_eq!(out.resp.rdata, 0);
}
