use clap::Parser;
use flowdiff::prelude::*;
use flowdiff::walker;
use rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;

/// A CLI tool to generate before/after flow pairs for the flowdiff engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The path to write the generated before flow to
    #[arg(long, default_value = "before.json")]
    before: String,

    /// The path to write the generated after flow to
    #[arg(long, default_value = "after.json")]
    after: String,

    /// Maximum container nesting depth
    #[arg(long, default_value_t = 3)]
    depth: usize,

    /// Maximum number of modules per child list
    #[arg(long, default_value_t = 4)]
    width: usize,

    /// Number of random edits applied to produce the after flow
    #[arg(long, default_value_t = 5)]
    edits: usize,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

struct Generator {
    rng: StdRng,
    depth: usize,
    width: usize,
    next_id: usize,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.width == 0 {
        eprintln!("Error: --width must be at least 1");
        std::process::exit(1);
    }

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut generator = Generator {
        rng,
        depth: cli.depth,
        width: cli.width,
        next_id: 0,
    };

    println!(
        "Generating flow (depth <= {}, width <= {}, {} edit(s))...",
        cli.depth, cli.width, cli.edits
    );

    let before = FlowValue::new(generator.modules(0));
    let mut after = before.clone();
    for _ in 0..cli.edits {
        generator.edit(&mut after);
    }
    println!(
        "-> Generated {} module(s), after flow has {}.",
        before.module_ids().len(),
        after.module_ids().len()
    );

    fs::write(&cli.before, before.to_json_pretty()?)?;
    fs::write(&cli.after, after.to_json_pretty()?)?;

    println!(
        "Successfully saved flows to '{}' and '{}'",
        cli.before, cli.after
    );
    Ok(())
}

impl Generator {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }

    fn modules(&mut self, depth: usize) -> Vec<FlowModule> {
        let count = self.rng.random_range(1..=self.width);
        (0..count).map(|_| self.module(depth)).collect()
    }

    fn module(&mut self, depth: usize) -> FlowModule {
        let id = self.fresh_id("m");
        if depth < self.depth && self.rng.random_bool(0.3) {
            let value = self.container(depth + 1);
            return FlowModule::new(id, value);
        }
        FlowModule::new(id, self.leaf())
    }

    fn container(&mut self, depth: usize) -> FlowModuleValue {
        match self.rng.random_range(0..5) {
            0 => FlowModuleValue::for_loop("flow_input.items", self.modules(depth)),
            1 => FlowModuleValue::while_loop(self.modules(depth)),
            2 => {
                let default = self.modules(depth);
                let arms = (0..self.rng.random_range(1..=3))
                    .map(|i| BranchArm::new(format!("flow_input.n == {}", i), self.modules(depth)))
                    .collect();
                FlowModuleValue::branch_one(default, arms)
            }
            3 => {
                let arms = (0..self.rng.random_range(1..=3))
                    .map(|_| ParallelArm::new(self.modules(depth)))
                    .collect();
                FlowModuleValue::branch_all(arms)
            }
            _ => FlowModuleValue::ai_agent(self.modules(depth)),
        }
    }

    fn leaf(&mut self) -> FlowModuleValue {
        match self.rng.random_range(0..4) {
            0 => FlowModuleValue::Identity,
            1 => FlowModuleValue::script(format!("f/scripts/step_{}", self.rng.random_range(0..50))),
            2 => FlowModuleValue::raw_script(
                format!("export function main() {{ return {}; }}", self.rng.random_range(0..1000)),
                "deno",
            ),
            _ => FlowModuleValue::raw_script(
                format!("def main():\n    return {}", self.rng.random_range(0..1000)),
                "python3",
            ),
        }
    }

    /// Applies one random edit: a removal, an insertion, a content change or a move.
    fn edit(&mut self, flow: &mut FlowValue) {
        let ids = module_ids(flow);
        if ids.is_empty() {
            let module = self.module(0);
            flow.modules.push(module);
            return;
        }
        let target = ids[self.rng.random_range(0..ids.len())].clone();

        match self.rng.random_range(0..4) {
            0 => {
                flowdiff::diff::remove_module_from_flow(flow, &target);
            }
            1 => {
                let depth = self.rng.random_range(0..=self.depth);
                let module = self.module(depth);
                self.insert_near(flow, &target, module);
            }
            2 => {
                let leaf = self.leaf();
                if let Some(module) = flow.module_mut(&target) {
                    if !module.kind().is_container() {
                        module.value = leaf;
                    } else {
                        module.summary = Some("edited".to_string());
                    }
                }
            }
            _ => {
                if let Some(module) = flowdiff::diff::remove_module_from_flow(flow, &target) {
                    let remaining = module_ids(flow);
                    let anchor = match remaining.len() {
                        0 => None,
                        len => Some(remaining[self.rng.random_range(0..len)].clone()),
                    };
                    match anchor {
                        Some(anchor) => self.insert_near(flow, &anchor, module),
                        None => flow.modules.push(module),
                    }
                }
            }
        }
    }

    /// Inserts `module` into the first child list of `anchor` when it is a container, next to
    /// it otherwise.
    fn insert_near(&mut self, flow: &mut FlowValue, anchor: &str, module: FlowModule) {
        let index = self.rng.random_range(0..=self.width);
        if let Some(container) = flow.module_mut(anchor) {
            if let Some((_, list)) = container.value.child_lists_mut().into_iter().next() {
                let at = index.min(list.len());
                list.insert(at, module);
                return;
            }
        }
        let at = index.min(flow.modules.len());
        flow.modules.insert(at, module);
    }
}

/// Ids in traversal order, so a seeded run is reproducible.
fn module_ids(flow: &FlowValue) -> Vec<String> {
    walker::flow_modules(flow)
        .into_iter()
        .map(|m| m.id.clone())
        .collect()
}
