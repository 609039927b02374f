//! Grammar lowering
//!
//! Turns a [`Grammar`] into a flat symbol table and a list of productions:
//! choices and optionals expand into alternatives, repetitions become hidden
//! left-recursive auxiliary rules, and every literal or inline pattern is
//! interned as an anonymous terminal.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::{LexicalRule, Production, SymbolId, SymbolInfo};
use crate::error::GrammarError;
use crate::grammar::{Assoc, Grammar, Rule};
use crate::lexer;

/// Cap on the alternatives a single rule may expand to
pub(crate) const MAX_ALTERNATIVES: usize = 4096;

/// Name of the augmented start symbol
pub(crate) const AUGMENTED_START: &str = "_start";

#[derive(Debug)]
pub(crate) struct LoweredGrammar {
    pub symbols: Vec<SymbolInfo>,
    pub terminal_count: usize,
    pub start_symbol: SymbolId,
    pub productions: Vec<Production>,
    pub lexical_rules: Vec<LexicalRule>,
    pub externals: Vec<SymbolId>,
    pub sync: Vec<SymbolId>,
    pub stable: Vec<SymbolId>,
    /// Sets of non-terminals whose mutual conflicts are intended
    pub expected_conflicts: Vec<Vec<SymbolId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TerminalKey {
    Named(SmolStr),
    Literal(String),
    Pattern(String),
}

struct TerminalDef {
    info: SymbolInfo,
    /// Rule source and whether it is literal text
    lexical: Option<(SmolStr, bool)>,
}

/// One expanded right-hand side
#[derive(Debug, Clone, PartialEq, Eq)]
struct Alt {
    symbols: Vec<SymbolId>,
    prec: Option<(i32, Assoc)>,
}

impl Alt {
    fn empty() -> Self {
        Self {
            symbols: Vec::new(),
            prec: None,
        }
    }
}

pub(crate) fn lower(grammar: &Grammar) -> Result<LoweredGrammar, GrammarError> {
    if let Some(name) = grammar.duplicates.first() {
        return Err(GrammarError::DuplicateRule(name.to_string()));
    }
    if grammar.rules.is_empty() {
        return Err(GrammarError::NoRules(grammar.name.to_string()));
    }

    let mut lowering = Lowering {
        grammar,
        terminals: IndexMap::new(),
        nonterminals: IndexMap::new(),
        productions: Vec::new(),
        repeat_counts: IndexMap::new(),
    };
    lowering.intern_terminals()?;
    lowering.intern_nonterminals();
    lowering.build_productions()?;
    lowering.finish()
}

struct Lowering<'g> {
    grammar: &'g Grammar,
    terminals: IndexMap<TerminalKey, TerminalDef>,
    /// Non-terminal name -> visible
    nonterminals: IndexMap<SmolStr, bool>,
    productions: Vec<Production>,
    repeat_counts: IndexMap<SmolStr, usize>,
}

impl<'g> Lowering<'g> {
    // =========================================================================
    // Symbols
    // =========================================================================

    fn intern_terminals(&mut self) -> Result<(), GrammarError> {
        let grammar = self.grammar;
        self.add_terminal(TerminalKey::Named("end".into()), "end", false, false, None);
        self.add_terminal(
            TerminalKey::Named("ERROR".into()),
            "ERROR",
            true,
            true,
            None,
        );

        for (name, body) in &grammar.tokens {
            let lexical = match body {
                Rule::String(text) => (SmolStr::new(text), true),
                Rule::Pattern(source) => (checked_pattern(source)?, false),
                _ => return Err(GrammarError::InvalidTokenRule(name.to_string())),
            };
            let visible = !name.starts_with('_');
            self.add_terminal(
                TerminalKey::Named(name.clone()),
                name,
                true,
                visible,
                Some(lexical),
            );
        }
        for name in &grammar.externals {
            let visible = !name.starts_with('_');
            self.add_terminal(TerminalKey::Named(name.clone()), name, true, visible, None);
        }
        for rule in grammar.rules.values() {
            self.collect_anonymous(rule)?;
        }

        for extra in &grammar.extras {
            let key = match extra {
                Rule::String(_) | Rule::Pattern(_) => {
                    self.collect_anonymous(extra)?;
                    anonymous_key(extra)
                }
                Rule::Symbol(name) => {
                    let key = TerminalKey::Named(name.clone());
                    self.terminals.contains_key(&key).then_some(key)
                }
                _ => None,
            };
            let Some(def) = key.and_then(|key| self.terminals.get_mut(&key)) else {
                return Err(GrammarError::InvalidDeclaration {
                    kind: "extras",
                    message: format!("{extra:?} is not a token"),
                });
            };
            def.info.extra = true;
            if matches!(extra, Rule::Pattern(_)) {
                def.info.visible = false;
            }
        }
        for token in &grammar.sync {
            if matches!(token, Rule::String(_)) {
                self.collect_anonymous(token)?;
            }
        }
        Ok(())
    }

    fn add_terminal(
        &mut self,
        key: TerminalKey,
        name: &str,
        named: bool,
        visible: bool,
        lexical: Option<(SmolStr, bool)>,
    ) {
        if self.terminals.contains_key(&key) {
            return;
        }
        let info = SymbolInfo {
            name: name.into(),
            terminal: true,
            named,
            visible,
            extra: false,
        };
        self.terminals.insert(key, TerminalDef { info, lexical });
    }

    fn collect_anonymous(&mut self, rule: &Rule) -> Result<(), GrammarError> {
        match rule {
            Rule::String(text) => {
                let key = TerminalKey::Literal(text.clone());
                let lexical = Some((SmolStr::new(text), true));
                self.add_terminal(key, text, false, true, lexical);
            }
            Rule::Pattern(source) => {
                let key = TerminalKey::Pattern(source.clone());
                if !self.terminals.contains_key(&key) {
                    let pattern = checked_pattern(source)?;
                    self.add_terminal(key, source, false, false, Some((pattern, false)));
                }
            }
            Rule::Seq(items) | Rule::Choice(items) => {
                for item in items {
                    self.collect_anonymous(item)?;
                }
            }
            Rule::Repeat(inner) | Rule::Repeat1(inner) => self.collect_anonymous(inner)?,
            Rule::Prec { rule, .. } => self.collect_anonymous(rule)?,
            Rule::Blank | Rule::Symbol(_) => {}
        }
        Ok(())
    }

    fn intern_nonterminals(&mut self) {
        self.nonterminals.insert(AUGMENTED_START.into(), false);
        for name in self.grammar.rules.keys() {
            let visible = !name.starts_with('_');
            self.nonterminals.insert(name.clone(), visible);
        }
    }

    fn terminal_id(&self, key: &TerminalKey) -> Option<SymbolId> {
        self.terminals
            .get_index_of(key)
            .map(|index| SymbolId(index as u16))
    }

    fn nonterminal_id(&self, name: &str) -> Option<SymbolId> {
        self.nonterminals
            .get_index_of(name)
            .map(|index| SymbolId((self.terminals.len() + index) as u16))
    }

    fn resolve(&self, name: &SmolStr, rule: &str) -> Result<SymbolId, GrammarError> {
        self.nonterminal_id(name)
            .filter(|_| name != AUGMENTED_START)
            .or_else(|| {
                self.terminal_id(&TerminalKey::Named(name.clone()))
                    .filter(|id| id.index() > 1)
            })
            .ok_or_else(|| GrammarError::UndefinedSymbol {
                name: name.to_string(),
                rule: rule.to_string(),
            })
    }

    // =========================================================================
    // Productions
    // =========================================================================

    fn build_productions(&mut self) -> Result<(), GrammarError> {
        let grammar = self.grammar;
        let augmented = self.nonterminal_id(AUGMENTED_START).unwrap_or(SymbolId(0));
        let Some((start_name, _)) = grammar.rules.first() else {
            return Err(GrammarError::NoRules(grammar.name.to_string()));
        };
        let start = self.resolve(start_name, AUGMENTED_START)?;
        self.productions.push(Production {
            lhs: augmented,
            rhs: vec![start].into_boxed_slice(),
            precedence: 0,
            assoc: Assoc::None,
        });

        for (name, rule) in &grammar.rules {
            let lhs = self.resolve(name, name)?;
            let alternatives = self.flatten(rule, name)?;
            self.push_alternatives(lhs, alternatives);
        }
        Ok(())
    }

    fn push_alternatives(&mut self, lhs: SymbolId, alternatives: Vec<Alt>) {
        let mut seen: Vec<&[SymbolId]> = Vec::new();
        let mut unique = Vec::with_capacity(alternatives.len());
        for (index, alt) in alternatives.iter().enumerate() {
            if seen.contains(&alt.symbols.as_slice()) {
                continue;
            }
            seen.push(&alt.symbols);
            unique.push(index);
        }
        for index in unique {
            let alt = &alternatives[index];
            let (precedence, assoc) = alt.prec.unwrap_or((0, Assoc::None));
            self.productions.push(Production {
                lhs,
                rhs: alt.symbols.clone().into_boxed_slice(),
                precedence,
                assoc,
            });
        }
    }

    fn flatten(&mut self, rule: &Rule, owner: &str) -> Result<Vec<Alt>, GrammarError> {
        let alternatives = match rule {
            Rule::Blank => vec![Alt::empty()],
            Rule::String(text) => vec![self.single(TerminalKey::Literal(text.clone()))],
            Rule::Pattern(source) => vec![self.single(TerminalKey::Pattern(source.clone()))],
            Rule::Symbol(name) => vec![Alt {
                symbols: vec![self.resolve(name, owner)?],
                prec: None,
            }],
            Rule::Seq(items) => {
                let mut acc = vec![Alt::empty()];
                for item in items {
                    let parts = self.flatten(item, owner)?;
                    self.check_limit(acc.len() * parts.len(), owner)?;
                    let mut next = Vec::with_capacity(acc.len() * parts.len());
                    for left in &acc {
                        for right in &parts {
                            let mut symbols = left.symbols.clone();
                            symbols.extend_from_slice(&right.symbols);
                            next.push(Alt {
                                symbols,
                                prec: left.prec.or(right.prec),
                            });
                        }
                    }
                    acc = next;
                }
                acc
            }
            Rule::Choice(items) => {
                let mut all = Vec::new();
                for item in items {
                    all.extend(self.flatten(item, owner)?);
                    self.check_limit(all.len(), owner)?;
                }
                all
            }
            Rule::Repeat(inner) => {
                let aux = self.repetition(inner, owner)?;
                vec![
                    Alt {
                        symbols: vec![aux],
                        prec: None,
                    },
                    Alt::empty(),
                ]
            }
            Rule::Repeat1(inner) => {
                let aux = self.repetition(inner, owner)?;
                vec![Alt {
                    symbols: vec![aux],
                    prec: None,
                }]
            }
            Rule::Prec { value, assoc, rule } => {
                let mut alternatives = self.flatten(rule, owner)?;
                for alt in &mut alternatives {
                    alt.prec.get_or_insert((*value, *assoc));
                }
                alternatives
            }
        };
        Ok(alternatives)
    }

    fn single(&self, key: TerminalKey) -> Alt {
        Alt {
            symbols: self.terminal_id(&key).into_iter().collect(),
            prec: None,
        }
    }

    /// `aux -> aux body | body`
    fn repetition(&mut self, body: &Rule, owner: &str) -> Result<SymbolId, GrammarError> {
        let count = self.repeat_counts.entry(owner.into()).or_insert(0);
        *count += 1;
        let name: SmolStr = format!("{owner}_repeat{count}").into();
        self.nonterminals.insert(name.clone(), false);
        let aux = self.nonterminal_id(&name).unwrap_or(SymbolId(0));

        let body = self.flatten(body, owner)?;
        let mut alternatives = Vec::with_capacity(body.len() * 2);
        for alt in &body {
            let mut symbols = vec![aux];
            symbols.extend_from_slice(&alt.symbols);
            alternatives.push(Alt {
                symbols,
                prec: alt.prec,
            });
        }
        alternatives.extend(body);
        self.push_alternatives(aux, alternatives);
        Ok(aux)
    }

    fn check_limit(&self, count: usize, owner: &str) -> Result<(), GrammarError> {
        if count > MAX_ALTERNATIVES {
            return Err(GrammarError::TooManyAlternatives {
                rule: owner.to_string(),
                limit: MAX_ALTERNATIVES,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn finish(self) -> Result<LoweredGrammar, GrammarError> {
        let grammar = self.grammar;
        let symbol_count = self.terminals.len() + self.nonterminals.len();
        if symbol_count > u16::MAX as usize {
            return Err(GrammarError::TooManySymbols(u16::MAX as usize));
        }

        let sync = grammar
            .sync
            .iter()
            .map(|token| {
                let key = match token {
                    Rule::String(text) => Some(TerminalKey::Literal(text.clone())),
                    Rule::Symbol(name) => Some(TerminalKey::Named(name.clone())),
                    _ => None,
                };
                key.and_then(|key| self.terminal_id(&key))
                    .filter(|id| id.index() > 1)
                    .ok_or_else(|| GrammarError::InvalidDeclaration {
                        kind: "sync",
                        message: format!("{token:?} is not a token"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rule_id = |kind: &'static str, name: &SmolStr| {
            self.nonterminal_id(name)
                .filter(|_| grammar.rules.contains_key(name))
                .ok_or_else(|| GrammarError::InvalidDeclaration {
                    kind,
                    message: format!("`{name}` is not a rule"),
                })
        };
        let stable = grammar
            .stable
            .iter()
            .map(|name| rule_id("stable", name))
            .collect::<Result<Vec<_>, _>>()?;
        let expected_conflicts = grammar
            .conflicts
            .iter()
            .map(|group| {
                let mut ids = group
                    .iter()
                    .map(|name| rule_id("conflicts", name))
                    .collect::<Result<Vec<_>, _>>()?;
                ids.sort_unstable();
                Ok(ids)
            })
            .collect::<Result<Vec<_>, GrammarError>>()?;

        let externals = grammar
            .externals
            .iter()
            .filter_map(|name| self.terminal_id(&TerminalKey::Named(name.clone())))
            .collect();
        let start_symbol = grammar
            .rules
            .first()
            .and_then(|(name, _)| self.nonterminal_id(name))
            .unwrap_or(SymbolId(0));

        let terminal_count = self.terminals.len();
        let mut symbols = Vec::with_capacity(symbol_count);
        let mut lexical_rules = Vec::new();
        for (index, def) in self.terminals.into_values().enumerate() {
            if let Some((pattern, literal)) = def.lexical {
                lexical_rules.push(LexicalRule {
                    symbol: SymbolId(index as u16),
                    pattern,
                    literal,
                });
            }
            symbols.push(def.info);
        }
        for (name, visible) in self.nonterminals {
            symbols.push(SymbolInfo {
                name,
                terminal: false,
                named: true,
                visible,
                extra: false,
            });
        }

        Ok(LoweredGrammar {
            symbols,
            terminal_count,
            start_symbol,
            productions: self.productions,
            lexical_rules,
            externals,
            sync,
            stable,
            expected_conflicts,
        })
    }
}

fn anonymous_key(rule: &Rule) -> Option<TerminalKey> {
    match rule {
        Rule::String(text) => Some(TerminalKey::Literal(text.clone())),
        Rule::Pattern(source) => Some(TerminalKey::Pattern(source.clone())),
        _ => None,
    }
}

fn checked_pattern(source: &str) -> Result<SmolStr, GrammarError> {
    lexer::rule_hir(source, false)?;
    Ok(SmolStr::new(source))
}
