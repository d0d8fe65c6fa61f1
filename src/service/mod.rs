//! Rule service - create, combine, evaluate and look up stored rules
//!
//! Owns a [`RuleStore`] and the engine settings. Every operation returns the
//! response body on success; failures are [`RuleEngineError`]s which turn
//! into an [`ErrorResponse`] with a status hint.

mod types;

pub use types::*;

use crate::config::EngineConfig;
use crate::error::{Result, RuleEngineError};
use crate::rule::{
    evaluate, get_or_parse, parse_rule, render_tree, Combiner, DataRecord, LogicalOp, Node,
};
use crate::store::{MemoryRuleStore, RuleRecord, RuleStore};
use rand::Rng;
use std::borrow::Borrow;
use std::sync::Arc;

const NAME_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Attempts at finding a free combined rule name
const MAX_NAME_ATTEMPTS: usize = 16;

/// A rule fetched from the store or parsed on the spot
enum ResolvedRule {
    Stored(Arc<RuleRecord>),
    Parsed(Node),
}

impl Borrow<Node> for ResolvedRule {
    fn borrow(&self) -> &Node {
        match self {
            ResolvedRule::Stored(record) => &record.tree,
            ResolvedRule::Parsed(tree) => tree,
        }
    }
}

/// Rule API over a store
pub struct RuleService<S: RuleStore = MemoryRuleStore> {
    store: S,
    config: EngineConfig,
    combiner: Combiner,
}

impl Default for RuleService {
    fn default() -> Self {
        Self::new(MemoryRuleStore::new(), EngineConfig::default())
    }
}

impl<S: RuleStore> RuleService<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        let combiner = Combiner::new(config.flatten_policy);
        Self {
            store,
            config,
            combiner,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Swap settings, keeping stored rules
    pub fn reconfigure(&mut self, config: EngineConfig) {
        self.combiner = Combiner::new(config.flatten_policy);
        self.config = config;
    }

    /// Parse a rule string, through the cache when enabled
    pub fn parse(&self, rule: &str) -> Result<Node> {
        if self.config.parse_cache {
            get_or_parse(rule)
        } else {
            parse_rule(rule)
        }
    }

    /// Parse and store a named rule
    pub fn create(&self, request: CreateRuleRequest) -> Result<RuleResponse> {
        tracing::info!(
            rule_name = ?request.rule_name,
            rule_string = ?request.rule_string,
            "create_rule request"
        );

        let (name, rule_string) = match (request.rule_name, request.rule_string) {
            (Some(name), Some(rule)) if !name.is_empty() && !rule.trim().is_empty() => (name, rule),
            _ => {
                return Err(RuleEngineError::InvalidRequest(
                    "ruleName and ruleString are required".to_string(),
                ))
            }
        };

        let tree = self.parse(&rule_string).map_err(|err| {
            tracing::error!(error = %err, "failed to parse rule string");
            err
        })?;

        let record = self.store.insert(&name, Some(&rule_string), tree)?;
        tracing::info!(id = record.id, rule_name = %record.name, "created rule");
        tracing::debug!("rule tree:\n{}", render_tree(&record.tree));

        Ok(RuleResponse::from(&*record))
    }

    /// Combine rules under one operator and store the result
    pub fn combine(&self, request: CombineRequest) -> Result<RuleResponse> {
        let op: LogicalOp = request
            .op
            .as_deref()
            .ok_or_else(|| RuleEngineError::InvalidRequest("op is required".to_string()))?
            .parse()?;

        let resolved = request
            .rules
            .iter()
            .map(|reference| self.resolve(reference))
            .collect::<Result<Vec<_>>>()?;

        let tree = self.combiner.combine(&resolved, op)?;
        tracing::debug!(
            inputs = resolved.len(),
            op = %op,
            policy = ?self.combiner.policy(),
            depth = tree.depth(),
            "combined rules"
        );

        let record = self.store_combined(tree)?;
        tracing::info!(id = record.id, rule_name = %record.name, "created combined rule");
        tracing::debug!("rule tree:\n{}", render_tree(&record.tree));

        Ok(RuleResponse::from(&*record))
    }

    /// Evaluate a tree or stored rule against a data record
    pub fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluateResponse> {
        self.evaluate_with(request.ast, &request.data)
    }

    /// [`Self::evaluate`] over any data record
    pub fn evaluate_with<D: DataRecord + ?Sized>(
        &self,
        ast: AstInput,
        data: &D,
    ) -> Result<EvaluateResponse> {
        let tree = match ast {
            AstInput::Tree(wire) => Node::try_from(wire)?,
            AstInput::Reference(identifier) => self.find(&identifier)?.tree.clone(),
        };

        let result = evaluate(&tree, data).map_err(|err| {
            tracing::debug!(error = %err, "evaluation failed");
            RuleEngineError::from(err)
        })?;

        Ok(EvaluateResponse { result, tree })
    }

    /// Tree of a stored rule, by id or name
    pub fn get_tree(&self, identifier: &str) -> Result<TreeResponse> {
        let record = self.find(identifier)?;
        Ok(TreeResponse {
            tree: record.tree.clone(),
        })
    }

    /// Remove a stored rule, by id or name
    pub fn delete(&self, identifier: &str) -> Result<RuleResponse> {
        let record = self.find(identifier)?;
        let removed = self
            .store
            .remove(record.id)
            .ok_or_else(|| RuleEngineError::RuleNotFound(identifier.to_string()))?;
        tracing::info!(id = removed.id, rule_name = %removed.name, "deleted rule");
        Ok(RuleResponse::from(&*removed))
    }

    fn find(&self, identifier: &str) -> Result<Arc<RuleRecord>> {
        self.store
            .find(identifier)
            .ok_or_else(|| RuleEngineError::RuleNotFound(identifier.to_string()))
    }

    /// Stored rule first, then a rule string
    fn resolve(&self, reference: &str) -> Result<ResolvedRule> {
        if let Some(record) = self.store.find(reference) {
            return Ok(ResolvedRule::Stored(record));
        }

        match self.parse(reference) {
            Ok(tree) => Ok(ResolvedRule::Parsed(tree)),
            // no comparator at all: meant as a name, not a rule
            Err(_) if !reference.chars().any(|c| matches!(c, '<' | '>' | '=' | '!')) => {
                Err(RuleEngineError::RuleNotFound(reference.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    fn store_combined(&self, tree: Node) -> Result<Arc<RuleRecord>> {
        let mut last_name = String::new();
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = self.combined_name();
            match self.store.insert(&name, None, tree.clone()) {
                Err(RuleEngineError::DuplicateName(taken)) => {
                    tracing::debug!(name = %taken, "combined rule name taken, retrying");
                    last_name = taken;
                }
                other => return other,
            }
        }
        Err(RuleEngineError::DuplicateName(last_name))
    }

    fn combined_name(&self) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..self.config.combined_name_length)
            .map(|_| NAME_LETTERS[rng.gen_range(0..NAME_LETTERS.len())] as char)
            .collect();
        format!("{}{}", self.config.combined_name_prefix, suffix)
    }
}
