use super::sim::console::Console;
use super::sim::mode::StepMode;
use super::sim::shell::{Command, Shell, HELP};
use super::utils::report::{PhaseTicks, RunReport};
use super::utils::trace::{TraceRecord, TraceWriter};
use super::workload::Workload;
use crate::config::{AppConfig, CrossbarModel};
use crate::error::{Result, SimError};
use crate::host::{Host, InferenceSession};
use crate::imc::{Crossbar, ExactCrossbar, NonlinearCrossbar};
use crate::top::Top;
use log::{debug, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub struct Simulator<X: Crossbar> {
  top: Top<X>,
  host: Host,
  session: InferenceSession,
  console: Console,
  trace: Option<TraceWriter<BufWriter<File>>>,

  workload: String,
  /// Transactions of hosts already retired
  transactions: u64,

  step_mode: StepMode,
  max_ticks: u64,
}

impl<X: Crossbar> Simulator<X> {
  pub fn new(config: &AppConfig, workload: Workload, crossbar: X) -> Result<Self> {
    workload.validate()?;
    let sim = &config.simulation;
    let mut session = InferenceSession::new(
      workload.model,
      workload.images,
      workload.labels,
      config.map,
      sim.settle_ticks,
      config.cpu,
    );
    let program = session.start();
    debug!("first host program: {} ops, {} reads", program.len(), program.read_count());

    let trace = if sim.trace_file.is_empty() {
      None
    } else {
      Some(TraceWriter::create(Path::new(&sim.trace_file))?)
    };

    Ok(Self {
      top: Top::new("top", config.memory.size, config.map, crossbar),
      host: Host::new(program),
      session,
      console: Console::new(),
      trace,
      workload: workload.name,
      transactions: 0,
      step_mode: StepMode::from_flag(sim.step_mode),
      max_ticks: sim.max_ticks,
    })
  }

  pub fn top(&self) -> &Top<X> {
    &self.top
  }

  pub fn session(&self) -> &InferenceSession {
    &self.session
  }

  pub fn console(&self) -> &Console {
    &self.console
  }

  /// Every host program has run
  pub fn is_finished(&self) -> bool {
    self.host.is_done() && self.session.is_done()
  }

  pub fn run(&mut self) -> Result<RunReport> {
    match self.step_mode {
      StepMode::Continuous => self.run_continuous()?,
      StepMode::Step => self.run_step_mode()?,
    }
    if let Some(trace) = &mut self.trace {
      trace.flush()?;
    }
    Ok(self.report())
  }

  fn run_continuous(&mut self) -> Result<()> {
    while !self.is_finished() {
      if self.top.ticks() >= self.max_ticks {
        return Err(SimError::TickBudget {
          max_ticks: self.max_ticks,
        });
      }
      self.step()?;
    }
    info!("inference finished after {} ticks", self.top.ticks());
    Ok(())
  }

  fn run_step_mode(&mut self) -> Result<()> {
    println!("Step mode - {}", HELP);
    let mut shell = Shell::new()?;
    while !self.is_finished() {
      match shell.read_command()? {
        Command::Step(n) => {
          for _ in 0..n {
            if self.is_finished() {
              break;
            }
            self.step()?;
          }
          println!("tick {}", self.top.ticks());
        }
        Command::Continue => return self.run_continuous(),
        Command::Info => self.print_info(),
        Command::Quit => break,
      }
    }
    Ok(())
  }

  fn print_info(&self) {
    let (done, total) = self.session.progress();
    println!("tick        {}", self.top.ticks());
    println!("images      {}/{}", done, total);
    println!("host op     {}/{}", self.host.pc(), self.host.program().len());
    println!("bus txns    {}", self.transactions + self.host.completed());
    println!("imc cells   {} programmed", self.top.imc.programmed());
    println!("uart lines  {}", self.console.lines().len());
  }

  /// Advance one tick: drive the host request, clock the SoC, then let the
  /// host and console observe the outputs. A finished host program hands its
  /// reads to the session, which supplies the next program.
  pub fn step(&mut self) -> Result<()> {
    let tick = self.top.ticks();
    let req = self.host.drive();
    let out = self.top.tick(req, None);
    self.host.observe(&out.resp);

    if let Some(tx) = out.uart {
      if let Some(line) = self.console.push(tx.byte(), tick) {
        info!("[uart] {}", line);
      }
    }
    if let Some(trace) = &mut self.trace {
      trace.record(&TraceRecord::new(tick, req.as_ref(), &out.resp))?;
    }

    if self.host.is_done() {
      if let Some(next) = self.session.advance(self.host.reads()) {
        debug!("next host program: {} ops, {} reads", next.len(), next.read_count());
        self.transactions += self.host.completed();
        self.host = Host::new(next);
      }
    }
    Ok(())
  }

  pub fn report(&self) -> RunReport {
    RunReport {
      workload: self.workload.clone(),
      model: self.top.imc.crossbar().name().to_string(),
      completed: self.is_finished(),
      ticks: self.top.ticks(),
      transactions: self.transactions + self.host.completed(),
      images: self.session.results().to_vec(),
      engines: self.session.summary(),
      phases: self
        .console
        .phases()
        .iter()
        .map(|(name, ticks)| PhaseTicks {
          name: name.clone(),
          ticks: *ticks,
        })
        .collect(),
      console: self.console.lines().to_vec(),
    }
  }
}

/// Run one workload with the crossbar model picked by the config
pub fn run_app(config: &AppConfig, workload: Workload) -> Result<RunReport> {
  let report = match config.crossbar.model {
    CrossbarModel::Exact => Simulator::new(config, workload, ExactCrossbar::new())?.run()?,
    CrossbarModel::Nonlinear => {
      Simulator::new(config, workload, NonlinearCrossbar::new(config.crossbar.device))?.run()?
    }
  };

  report.log_summary();
  if !config.simulation.report_file.is_empty() {
    let path = Path::new(&config.simulation.report_file);
    report.write_json(path)?;
    info!("report written to {}", path.display());
  }
  Ok(report)
}
