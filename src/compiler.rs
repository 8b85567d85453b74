//! Whole-workflow graph compiler.
//!
//! Feed each cycling section's graph text to [`WorkflowCompiler::compile_section`],
//! then call [`WorkflowCompiler::finish`] for the compiled [`WorkflowDef`].

use std::collections::BTreeMap;

use crate::config::{CompilerConfig, RuntimeLookup};
use crate::error::GraphError;
use crate::expand::ParameterExpander;
use crate::ir::{TaskDef, TriggerTable, WorkflowDef};
use crate::lower;
use crate::parse::{GraphParser, PollingInfo};

pub struct WorkflowCompiler<'a> {
    config: CompilerConfig,
    family_map: BTreeMap<String, Vec<String>>,
    expander: &'a dyn ParameterExpander,
    runtime: &'a dyn RuntimeLookup,
    table: TriggerTable,
    tasks: BTreeMap<String, TaskDef>,
    sequences: Vec<String>,
    task_output_opt: BTreeMap<(String, String), bool>,
    memb_output_opt: BTreeMap<(String, String), bool>,
    polling: BTreeMap<String, PollingInfo>,
}

impl<'a> WorkflowCompiler<'a> {
    pub fn new(
        config: CompilerConfig,
        family_map: BTreeMap<String, Vec<String>>,
        expander: &'a dyn ParameterExpander,
        runtime: &'a dyn RuntimeLookup,
    ) -> Self {
        WorkflowCompiler {
            config,
            family_map,
            expander,
            runtime,
            table: TriggerTable::default(),
            tasks: BTreeMap::new(),
            sequences: Vec::new(),
            task_output_opt: BTreeMap::new(),
            memb_output_opt: BTreeMap::new(),
            polling: BTreeMap::new(),
        }
    }

    /// Parse and lower one cycling section's graph text.
    pub fn compile_section(&mut self, sequence: &str, text: &str) -> Result<(), GraphError> {
        tracing::debug!(sequence, "compiling graph section");
        let mut parser = GraphParser::new(&self.config, &self.family_map, self.expander);
        parser.parse_graph(text)?;
        let section = parser.finish();

        lower::lower_section(
            sequence,
            &section,
            self.config.initial_point.as_deref(),
            &mut self.table,
            &mut self.tasks,
        )?;

        for (key, optional) in section.task_output_opt {
            self.merge_task_record(key, optional)?;
        }
        for (key, optional) in section.memb_output_opt {
            // Weak family-derived records: disagreement across sections
            // relaxes the output to optional.
            match self.memb_output_opt.get(&key).copied() {
                Some(already) if already != optional => {
                    self.memb_output_opt.insert(key, true);
                }
                Some(_) => {}
                None => {
                    self.memb_output_opt.insert(key, optional);
                }
            }
        }
        self.polling.extend(section.polling);

        if !self.sequences.iter().any(|s| s == sequence) {
            self.sequences.push(sequence.to_string());
        }
        Ok(())
    }

    fn merge_task_record(
        &mut self,
        key: (String, String),
        optional: bool,
    ) -> Result<(), GraphError> {
        match self.task_output_opt.get(&key).copied() {
            None => {
                self.task_output_opt.insert(key, optional);
            }
            Some(already) if already != optional => {
                if self.config.back_compat {
                    tracing::warn!(
                        task = %key.0,
                        output = %key.1,
                        "output used as both optional and required; treating as optional"
                    );
                    self.task_output_opt.insert(key, true);
                } else {
                    return Err(GraphError::semantic(
                        "S008",
                        format!("{}:{} can't be both optional and required", key.0, key.1),
                    ));
                }
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Run whole-workflow checks and assemble the compiled definition.
    pub fn finish(mut self) -> Result<WorkflowDef, GraphError> {
        let graph = lower::finalize(
            &self.config,
            self.runtime,
            &mut self.tasks,
            &self.task_output_opt,
            &self.memb_output_opt,
            &self.polling,
        )?;
        tracing::debug!(
            tasks = self.tasks.len(),
            triggers = self.table.len(),
            "workflow graph compiled"
        );
        Ok(WorkflowDef {
            tasks: self.tasks,
            sequences: self.sequences,
            graph,
        })
    }
}
