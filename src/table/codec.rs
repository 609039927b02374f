//! Binary grammar table format
//!
//! ```text
//! magic "SYLV" | version u8 | payload (little endian) | fnv1a-32 u32
//! ```
//!
//! The payload stores the name, symbols, productions, lexical rules (pattern
//! sources), externals, sync and stable symbols, then the action and goto
//! tables. The lexer automaton is rebuilt from the sources on load.
//! Every id is range-checked while decoding, so a table that loads is safe
//! to parse with.

use smol_str::SmolStr;

use super::{
    Action, LexicalRule, NO_GOTO, Production, ProductionId, StateId, SymbolId, SymbolInfo,
    TableParts,
};
use crate::error::GrammarLoadError;
use crate::grammar::Assoc;

pub const MAGIC: &[u8; 4] = b"SYLV";

/// Bumped whenever the layout changes
pub const FORMAT_VERSION: u8 = 2;

const FLAG_TERMINAL: u8 = 1;
const FLAG_NAMED: u8 = 1 << 1;
const FLAG_VISIBLE: u8 = 1 << 2;
const FLAG_EXTRA: u8 = 1 << 3;

const ACTION_SHIFT: u8 = 0;
const ACTION_REDUCE: u8 = 1;
const ACTION_ACCEPT: u8 = 2;

/// FNV-1a, 32 bit
fn checksum(bytes: &[u8]) -> u32 {
    let mut hash = 0x811c_9dc5u32;
    for &b in bytes {
        hash = (hash ^ u32::from(b)).wrapping_mul(0x0100_0193);
    }
    hash
}

// ============================================================================
// ENCODING
// ============================================================================

pub(crate) fn encode(parts: &TableParts) -> Vec<u8> {
    let mut w = Writer { out: Vec::new() };
    w.out.extend_from_slice(MAGIC);
    w.u8(FORMAT_VERSION);

    w.str(&parts.name);
    w.u32(parts.symbols.len() as u32);
    w.u32(parts.terminal_count as u32);
    for symbol in &parts.symbols {
        w.str(&symbol.name);
        let mut flags = 0;
        for (set, flag) in [
            (symbol.terminal, FLAG_TERMINAL),
            (symbol.named, FLAG_NAMED),
            (symbol.visible, FLAG_VISIBLE),
            (symbol.extra, FLAG_EXTRA),
        ] {
            if set {
                flags |= flag;
            }
        }
        w.u8(flags);
    }
    w.u16(parts.start_symbol.0);

    w.u32(parts.productions.len() as u32);
    for production in &parts.productions {
        w.u16(production.lhs.0);
        w.symbols(&production.rhs);
        w.i32(production.precedence);
        w.u8(match production.assoc {
            Assoc::None => 0,
            Assoc::Left => 1,
            Assoc::Right => 2,
        });
    }

    w.u32(parts.lexical_rules.len() as u32);
    for rule in &parts.lexical_rules {
        w.u16(rule.symbol.0);
        w.u8(rule.literal as u8);
        w.str(&rule.pattern);
    }

    w.symbols(&parts.externals);
    w.symbols(&parts.sync);
    w.symbols(&parts.stable);

    w.u32(parts.state_count as u32);
    for cell in &parts.actions {
        w.u16(cell.len() as u16);
        for action in cell.iter() {
            match action {
                Action::Shift(state) => {
                    w.u8(ACTION_SHIFT);
                    w.u32(state.0);
                }
                Action::Reduce(production) => {
                    w.u8(ACTION_REDUCE);
                    w.u32(production.0);
                }
                Action::Accept => {
                    w.u8(ACTION_ACCEPT);
                    w.u32(0);
                }
            }
        }
    }
    for &target in &parts.gotos {
        w.u32(target);
    }

    let sum = checksum(&w.out);
    w.u32(sum);
    w.out
}

struct Writer {
    out: Vec<u8>,
}

impl Writer {
    fn u8(&mut self, value: u8) {
        self.out.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.out.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.out.extend_from_slice(&value.to_le_bytes());
    }

    fn i32(&mut self, value: i32) {
        self.out.extend_from_slice(&value.to_le_bytes());
    }

    fn str(&mut self, value: &str) {
        self.u32(value.len() as u32);
        self.out.extend_from_slice(value.as_bytes());
    }

    fn symbols(&mut self, symbols: &[SymbolId]) {
        self.u32(symbols.len() as u32);
        for symbol in symbols {
            self.u16(symbol.0);
        }
    }
}

// ============================================================================
// DECODING
// ============================================================================

pub(crate) fn decode(bytes: &[u8]) -> Result<TableParts, GrammarLoadError> {
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return Err(GrammarLoadError::BadMagic);
    }
    let truncated = GrammarLoadError::Truncated {
        offset: bytes.len(),
    };
    let version = *bytes.get(MAGIC.len()).ok_or_else(|| truncated.clone())?;
    if version != FORMAT_VERSION {
        return Err(GrammarLoadError::VersionMismatch {
            found: version,
            expected: FORMAT_VERSION,
        });
    }
    let body_end = bytes
        .len()
        .checked_sub(4)
        .filter(|&end| end > MAGIC.len())
        .ok_or(truncated)?;
    let mut stored = [0u8; 4];
    stored.copy_from_slice(&bytes[body_end..]);
    let stored = u32::from_le_bytes(stored);
    let computed = checksum(&bytes[..body_end]);
    if stored != computed {
        return Err(GrammarLoadError::ChecksumMismatch { stored, computed });
    }

    let mut r = Reader {
        bytes: &bytes[..body_end],
        pos: MAGIC.len() + 1,
    };
    let parts = r.table()?;
    if r.pos != body_end {
        return Err(GrammarLoadError::corrupt(format!(
            "{} trailing bytes after table",
            body_end - r.pos
        )));
    }
    Ok(parts)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], GrammarLoadError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(GrammarLoadError::Truncated { offset: self.pos })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], GrammarLoadError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, GrammarLoadError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, GrammarLoadError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, GrammarLoadError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32, GrammarLoadError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    /// A length prefix, checked against the remaining bytes so corrupt input
    /// cannot trigger huge allocations.
    fn len(&mut self, min_item_size: usize) -> Result<usize, GrammarLoadError> {
        let len = self.u32()? as usize;
        let remaining = self.bytes.len() - self.pos;
        if len.saturating_mul(min_item_size.max(1)) > remaining {
            return Err(GrammarLoadError::Truncated { offset: self.pos });
        }
        Ok(len)
    }

    fn str(&mut self) -> Result<&'a str, GrammarLoadError> {
        let len = self.len(1)?;
        std::str::from_utf8(self.take(len)?)
            .map_err(|_| GrammarLoadError::corrupt("invalid utf-8 string"))
    }

    fn symbol(&mut self, symbol_count: usize) -> Result<SymbolId, GrammarLoadError> {
        let id = self.u16()?;
        if id as usize >= symbol_count {
            return Err(GrammarLoadError::corrupt(format!("symbol id {id} out of range")));
        }
        Ok(SymbolId(id))
    }

    fn symbols(&mut self, symbol_count: usize) -> Result<Vec<SymbolId>, GrammarLoadError> {
        let len = self.len(2)?;
        (0..len).map(|_| self.symbol(symbol_count)).collect()
    }

    fn table(&mut self) -> Result<TableParts, GrammarLoadError> {
        let name = SmolStr::new(self.str()?);

        let symbol_count = self.len(5)?;
        let terminal_count = self.u32()? as usize;
        if terminal_count < 2
            || terminal_count >= symbol_count
            || symbol_count > u16::MAX as usize
        {
            return Err(GrammarLoadError::corrupt("invalid symbol counts"));
        }
        let mut symbols = Vec::with_capacity(symbol_count);
        for index in 0..symbol_count {
            let name = SmolStr::new(self.str()?);
            let flags = self.u8()?;
            let terminal = flags & FLAG_TERMINAL != 0;
            if terminal != (index < terminal_count) {
                return Err(GrammarLoadError::corrupt(format!(
                    "symbol `{name}` in the wrong section"
                )));
            }
            symbols.push(SymbolInfo {
                name,
                terminal,
                named: flags & FLAG_NAMED != 0,
                visible: flags & FLAG_VISIBLE != 0,
                extra: flags & FLAG_EXTRA != 0,
            });
        }
        let start_symbol = self.symbol(symbol_count)?;
        // The augmented start symbol is the first non-terminal
        if start_symbol.index() <= terminal_count {
            return Err(GrammarLoadError::corrupt("start symbol is not a rule"));
        }

        let production_count = self.len(11)?;
        let mut productions = Vec::with_capacity(production_count);
        for _ in 0..production_count {
            let lhs = self.symbol(symbol_count)?;
            if lhs.index() < terminal_count {
                return Err(GrammarLoadError::corrupt("production for a terminal"));
            }
            let rhs = self.symbols(symbol_count)?.into_boxed_slice();
            let precedence = self.i32()?;
            let assoc = match self.u8()? {
                0 => Assoc::None,
                1 => Assoc::Left,
                2 => Assoc::Right,
                other => {
                    let message = format!("invalid associativity {other}");
                    return Err(GrammarLoadError::corrupt(message));
                }
            };
            productions.push(Production {
                lhs,
                rhs,
                precedence,
                assoc,
            });
        }
        if productions.first().map(|p| p.lhs.index()) != Some(terminal_count) {
            return Err(GrammarLoadError::corrupt("missing start production"));
        }

        let rule_count = self.len(4)?;
        let mut lexical_rules = Vec::with_capacity(rule_count);
        for _ in 0..rule_count {
            let symbol = self.symbol(symbol_count)?;
            if symbol.index() >= terminal_count {
                return Err(GrammarLoadError::corrupt("lexical rule for a non-terminal"));
            }
            let literal = self.u8()? != 0;
            let pattern = SmolStr::new(self.str()?);
            lexical_rules.push(LexicalRule {
                symbol,
                pattern,
                literal,
            });
        }

        let externals = self.symbols(symbol_count)?;
        let sync = self.symbols(symbol_count)?;
        let stable = self.symbols(symbol_count)?;
        let non_terminal = |s: &SymbolId| s.index() >= terminal_count;
        if externals.iter().chain(&sync).any(non_terminal) || !stable.iter().all(non_terminal) {
            return Err(GrammarLoadError::corrupt("declaration refers to the wrong kind of symbol"));
        }

        let state_count = self.u32()? as usize;
        let nonterminal_count = symbol_count - terminal_count;
        let cell_count = state_count
            .checked_mul(terminal_count)
            .filter(|&n| n.saturating_mul(2) <= self.bytes.len() - self.pos)
            .ok_or(GrammarLoadError::Truncated { offset: self.pos })?;
        let mut actions = Vec::with_capacity(cell_count);
        for _ in 0..cell_count {
            let len = self.u16()? as usize;
            let mut cell = Vec::with_capacity(len);
            for _ in 0..len {
                let tag = self.u8()?;
                let value = self.u32()?;
                let action = match tag {
                    ACTION_SHIFT if (value as usize) < state_count => Action::Shift(StateId(value)),
                    ACTION_REDUCE if (value as usize) < production_count => {
                        Action::Reduce(ProductionId(value))
                    }
                    ACTION_ACCEPT => Action::Accept,
                    _ => {
                        let message = format!("invalid action {tag}:{value}");
                        return Err(GrammarLoadError::corrupt(message));
                    }
                };
                cell.push(action);
            }
            actions.push(cell.into_boxed_slice());
        }
        let goto_count = state_count * nonterminal_count;
        if goto_count.saturating_mul(4) > self.bytes.len() - self.pos {
            return Err(GrammarLoadError::Truncated { offset: self.pos });
        }
        let mut gotos = Vec::with_capacity(goto_count);
        for _ in 0..goto_count {
            let target = self.u32()?;
            if target != NO_GOTO && target as usize >= state_count {
                return Err(GrammarLoadError::corrupt(format!("goto target {target} out of range")));
            }
            gotos.push(target);
        }

        Ok(TableParts {
            name,
            symbols,
            terminal_count,
            start_symbol,
            productions,
            lexical_rules,
            externals,
            sync,
            stable,
            state_count,
            actions,
            gotos,
        })
    }
}
