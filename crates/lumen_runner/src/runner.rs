//! Script runs driven by a [`RunnerConfig`]

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use lumen_graph::{NodeScript, NodeScriptRecord, NodeTypeRegistry, ScriptContext, Value};
use std::path::Path;

/// Outcome of running a script for the configured number of ticks
#[derive(Debug)]
pub struct ScriptRun {
    /// Result of every tick, in order
    pub results: Vec<Value>,
    /// The script saved again after the last tick
    pub record: NodeScriptRecord,
}

impl ScriptRun {
    pub fn last(&self) -> Option<&Value> {
        self.results.last()
    }
}

/// Read a saved script record
pub fn read_record(path: &Path) -> Result<NodeScriptRecord, RunnerError> {
    let json = std::fs::read_to_string(path)?;
    let record = NodeScriptRecord::from_json(&json)?;
    log::info!(
        "Read script '{}' from {} ({} nodes, {} connections)",
        record.name,
        path.display(),
        record.nodes.len(),
        record.connections.len()
    );
    Ok(record)
}

/// Write a script record as pretty JSON
pub fn write_record(path: &Path, record: &NodeScriptRecord) -> Result<(), RunnerError> {
    std::fs::write(path, record.to_json_pretty()?)?;
    log::info!("Saved script '{}' to {}", record.name, path.display());
    Ok(())
}

/// Restore `record`, initialize it with the configured context and run it
pub fn run_record(
    record: NodeScriptRecord,
    config: &RunnerConfig,
    registry: &NodeTypeRegistry,
) -> Result<ScriptRun, RunnerError> {
    let result_type = config.result_type()?;
    let mut script = NodeScript::from_record(record, result_type, registry);
    script.set_context(ScriptContext::new(config.context.clone()));
    script.initialize()?;

    let mut results = Vec::with_capacity(config.ticks as usize);
    for tick in 0..config.ticks {
        script.run();
        let result = script.result();
        log::info!("Tick {}: {} = {}", tick, script.name(), result);
        results.push(result);
    }

    let record = script.save().clone();
    Ok(ScriptRun { results, record })
}

/// Run the script named by `config`, writing it back out if an output is set
pub fn run(config: &RunnerConfig, registry: &NodeTypeRegistry) -> Result<ScriptRun, RunnerError> {
    let path = config.script.as_deref().ok_or(RunnerError::MissingScript)?;
    let record = read_record(path)?;
    let run = run_record(record, config, registry)?;

    if let Some(output) = &config.output {
        write_record(output, &run.record)?;
    }
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_graph::{Node, NodeCategory, NodeTypeInfo, NodeTypeKey, OutputPin, PinAddress, PinSlot, ValueType};
    use lumen_nodes::static_value::StaticValueNode;

    /// Outputs the `universe` entry of the runner context
    struct UniverseNode {
        output: OutputPin,
    }

    impl Node for UniverseNode {
        fn evaluate(&mut self, ctx: &mut lumen_graph::EvalContext<'_>) {
            let universe = ctx
                .context()
                .downcast_ref::<toml::Table>()
                .and_then(|table| table.get("universe"))
                .and_then(|value| value.as_integer())
                .unwrap_or(0) as i32;
            ctx.set_output(self.output, universe);
        }
    }

    fn registry() -> NodeTypeRegistry {
        let registry = NodeTypeRegistry::new();
        lumen_nodes::register_builtin_nodes(&registry);
        registry.register_fn(
            NodeTypeInfo::new(NodeTypeKey::new(lumen_graph::PluginId::new("test.runner"), "Universe"), "Universe")
                .category(NodeCategory::Custom("Runner".into())),
            |_, _, builder| {
                Box::new(UniverseNode {
                    output: builder.output("Universe", ValueType::Int),
                })
            },
        );
        registry
    }

    fn exit_input(script: &NodeScript) -> PinAddress {
        PinAddress::new(script.exit_node(), PinSlot::Single(0))
    }

    fn clamp_record(registry: &NodeTypeRegistry) -> NodeScriptRecord {
        let mut script = NodeScript::new("Dimmer", "", ValueType::Float, registry);
        let value = script.create_node(&lumen_nodes::plugin(), "StaticFloat").unwrap();
        script
            .set_node_storage(value, Some(StaticValueNode::storage(2.5f32).unwrap()))
            .unwrap();
        let clamp = script.create_node(&lumen_nodes::plugin(), "Clamp").unwrap();
        script
            .connect(PinAddress::new(value, PinSlot::Single(0)), PinAddress::new(clamp, PinSlot::Single(0)))
            .unwrap();
        script
            .connect(PinAddress::new(clamp, PinSlot::Single(3)), exit_input(&script))
            .unwrap();
        script.save().clone()
    }

    #[test]
    fn test_run_record_for_each_tick() {
        let registry = registry();
        let config = RunnerConfig {
            ticks: 3,
            result_type: "Float".to_string(),
            ..Default::default()
        };

        let run = run_record(clamp_record(&registry), &config, &registry).unwrap();
        assert_eq!(run.results, vec![Value::Float(1.0); 3]);
        assert_eq!(run.last(), Some(&Value::Float(1.0)));
        assert_eq!(run.record.nodes.len(), 3);
        assert_eq!(run.record.connections.len(), 2);
    }

    #[test]
    fn test_context_reaches_nodes() {
        let registry = registry();
        let mut script = NodeScript::new("Patch", "", ValueType::Int, &registry);
        let universe = script
            .create_node(&lumen_graph::PluginId::new("test.runner"), "Universe")
            .unwrap();
        script
            .connect(PinAddress::new(universe, PinSlot::Single(0)), exit_input(&script))
            .unwrap();
        let record = script.save().clone();

        let config = RunnerConfig::from_toml("result_type = \"Int\"\n[context]\nuniverse = 7\n").unwrap();
        let run = run_record(record, &config, &registry).unwrap();
        assert_eq!(run.last(), Some(&Value::Int(7)));
    }

    #[test]
    fn test_zero_ticks_still_saves() {
        let registry = registry();
        let config = RunnerConfig {
            ticks: 0,
            ..Default::default()
        };
        let run = run_record(clamp_record(&registry), &config, &registry).unwrap();
        assert!(run.results.is_empty());
        assert_eq!(run.record.name, "Dimmer");
    }

    #[test]
    fn test_run_without_script() {
        let registry = registry();
        assert!(matches!(
            run(&RunnerConfig::default(), &registry),
            Err(RunnerError::MissingScript)
        ));
    }

    #[test]
    fn test_run_reads_and_writes_files() {
        let registry = registry();
        let dir = std::env::temp_dir();
        let input = dir.join(format!("lumen-run-in-{}.json", std::process::id()));
        let output = dir.join(format!("lumen-run-out-{}.json", std::process::id()));
        std::fs::write(&input, clamp_record(&registry).to_json().unwrap()).unwrap();

        let config = RunnerConfig {
            script: Some(input.clone()),
            output: Some(output.clone()),
            result_type: "Float".to_string(),
            ..Default::default()
        };
        let run = run(&config, &registry).unwrap();
        let saved = NodeScriptRecord::from_json(&std::fs::read_to_string(&output).unwrap()).unwrap();
        std::fs::remove_file(&input).unwrap();
        std::fs::remove_file(&output).unwrap();

        assert_eq!(run.last(), Some(&Value::Float(1.0)));
        assert_eq!(saved, run.record);
    }
}
