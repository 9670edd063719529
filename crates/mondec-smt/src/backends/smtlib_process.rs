use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::backends::smtlib_printer::{quote_symbol, sort_to_smtlib, to_smtlib};
use crate::formula::Var;
use crate::solver::{Model, ModelValue, SatAnswer, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum SmtLibProcessError {
    #[error("solver I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("solver not found: {0}")]
    NotFound(String),
    #[error("solver error: {0}")]
    SolverError(String),
    #[error("Failed to parse solver output: {0}")]
    ParseError(String),
}

/// Program and arguments that start a solver reading SMT-LIB2 on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverCommand {
    pub name: &'static str,
    pub program: String,
    pub args: Vec<String>,
}

impl SolverCommand {
    /// `z3 -in`; a non-zero timeout becomes `-t:<ms>`.
    pub fn z3(timeout_secs: u64) -> Self {
        let mut args = vec!["-in".to_string(), "-smt2".to_string()];
        if timeout_secs > 0 {
            args.push(format!("-t:{}", timeout_secs.saturating_mul(1000)));
        }
        Self {
            name: "z3",
            program: "z3".to_string(),
            args,
        }
    }

    /// `cvc5` in incremental mode; a non-zero timeout becomes `--tlimit-per`.
    pub fn cvc5(timeout_secs: u64) -> Self {
        let mut args: Vec<String> = ["--lang", "smt2", "--incremental", "--produce-models"]
            .into_iter()
            .map(String::from)
            .collect();
        if timeout_secs > 0 {
            args.push(format!("--tlimit-per={}", timeout_secs.saturating_mul(1000)));
        }
        Self {
            name: "cvc5",
            program: "cvc5".to_string(),
            args,
        }
    }
}

/// An external SMT-LIB2 solver driven over its standard streams.
pub struct SmtLibProcess {
    name: &'static str,
    logic: String,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
    vars: HashMap<String, SmtSort>,
}

impl SmtLibProcess {
    pub fn z3(logic: &str, timeout_secs: u64) -> Result<Self, SmtLibProcessError> {
        Self::spawn(&SolverCommand::z3(timeout_secs), logic)
    }

    pub fn cvc5(logic: &str, timeout_secs: u64) -> Result<Self, SmtLibProcessError> {
        Self::spawn(&SolverCommand::cvc5(timeout_secs), logic)
    }

    pub fn spawn(command: &SolverCommand, logic: &str) -> Result<Self, SmtLibProcessError> {
        let program = &command.program;
        let mut child = Command::new(program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SmtLibProcessError::NotFound(format!("{program}: {e}")))?;
        let pipe_err =
            |which: &str| SmtLibProcessError::SolverError(format!("no {which} pipe for {program}"));
        let stdin = child.stdin.take().ok_or_else(|| pipe_err("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| pipe_err("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| pipe_err("stderr"))?;

        let mut solver = Self {
            name: command.name,
            logic: logic.to_string(),
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr: BufReader::new(stderr),
            vars: HashMap::new(),
        };
        solver.send_preamble()?;
        Ok(solver)
    }

    fn send_preamble(&mut self) -> Result<(), SmtLibProcessError> {
        self.emit("(set-option :print-success false)")?;
        self.emit("(set-option :produce-models true)")?;
        let logic = self.logic.clone();
        self.emit(&format!("(set-logic {logic})"))
    }

    /// Send a command that answers with one s-expression and read it.
    fn query(&mut self, cmd: &str) -> Result<String, SmtLibProcessError> {
        self.emit(cmd)?;
        let response = self.read_sexpr()?;
        if response.is_empty() {
            let mut stderr = String::new();
            let _ = self.stderr.read_line(&mut stderr);
            return Err(SmtLibProcessError::SolverError(format!(
                "{} closed its output after `{cmd}`: {}",
                self.name,
                stderr.trim()
            )));
        }
        if response.starts_with("(error") {
            return Err(SmtLibProcessError::SolverError(response));
        }
        Ok(response)
    }

    /// Send a command that answers nothing while `:print-success` is off.
    fn emit(&mut self, cmd: &str) -> Result<(), SmtLibProcessError> {
        debug!(solver = self.name, %cmd, "smtlib: send");
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Read one complete response: a bare atom line or a balanced s-expression,
    /// which `get-value` may spread over several lines.
    fn read_sexpr(&mut self) -> Result<String, SmtLibProcessError> {
        let mut response = String::new();
        let mut depth = 0i64;
        loop {
            let mut line = String::new();
            if self.stdout.read_line(&mut line)? == 0 {
                break;
            }
            depth += paren_balance(&line);
            response.push_str(line.trim_end());
            if depth <= 0 && !response.trim().is_empty() {
                break;
            }
            response.push(' ');
        }
        Ok(response.trim().to_string())
    }
}

impl Drop for SmtLibProcess {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl SmtSolver for SmtLibProcess {
    type Error = SmtLibProcessError;

    fn name(&self) -> &'static str {
        self.name
    }

    fn declare(&mut self, var: &Var) -> Result<(), SmtLibProcessError> {
        match self.vars.get(&var.name) {
            Some(sort) if *sort == var.sort => return Ok(()),
            Some(_) => {
                return Err(SmtLibProcessError::SolverError(format!(
                    "`{}` redeclared as {}",
                    var.name, var.sort
                )))
            }
            None => {}
        }
        let symbol = quote_symbol(&var.name);
        let sort = sort_to_smtlib(&var.sort);
        self.emit(&format!("(declare-const {symbol} {sort})"))?;
        self.vars.insert(var.name.clone(), var.sort);
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), SmtLibProcessError> {
        let smt_str = to_smtlib(term);
        self.emit(&format!("(assert {smt_str})"))
    }

    fn check(&mut self, read_back: &[Var]) -> Result<SatAnswer, SmtLibProcessError> {
        let response = self.query("(check-sat)")?;
        match response.as_str() {
            "sat" => {}
            "unsat" => return Ok(SatAnswer::Unsat),
            "unknown" | "timeout" => {
                return Ok(SatAnswer::Unknown(format!(
                    "{} returned {response}",
                    self.name
                )))
            }
            other => return Err(SmtLibProcessError::SolverError(other.to_string())),
        }

        let mut model = Model::default();
        for var in read_back {
            if !self.vars.contains_key(&var.name) {
                continue;
            }
            let symbol = quote_symbol(&var.name);
            let response = self.query(&format!("(get-value ({symbol}))"))?;
            let value = parse_value(&response, &var.sort).ok_or_else(|| {
                SmtLibProcessError::ParseError(format!("value of `{}`: {response}", var.name))
            })?;
            model.insert(var.name.clone(), value);
        }
        Ok(SatAnswer::Sat(model))
    }

    fn reset(&mut self) -> Result<(), SmtLibProcessError> {
        self.emit("(reset)")?;
        self.send_preamble()?;
        self.vars.clear();
        Ok(())
    }
}

fn paren_balance(line: &str) -> i64 {
    let mut depth = 0i64;
    let mut in_quoted_symbol = false;
    for ch in line.chars() {
        match ch {
            '|' => in_quoted_symbol = !in_quoted_symbol,
            '(' if !in_quoted_symbol => depth += 1,
            ')' if !in_quoted_symbol => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// Parse the value part of a `((name value))` response.
fn parse_value(response: &str, sort: &SmtSort) -> Option<ModelValue> {
    let inner = response.trim().strip_prefix("((")?.strip_suffix("))")?.trim();
    let val_str = if let Some(rest) = inner.strip_prefix('|') {
        // quoted name: skip up to the closing bar
        rest.split_once('|')?.1.trim()
    } else {
        inner.split_once(char::is_whitespace)?.1.trim()
    };

    match sort {
        SmtSort::Int => parse_int(val_str).map(ModelValue::Int),
        SmtSort::Bool => match val_str {
            "true" => Some(ModelValue::Bool(true)),
            "false" => Some(ModelValue::Bool(false)),
            _ => None,
        },
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("(-").and_then(|r| r.strip_suffix(')')) {
        rest.trim().parse::<i64>().ok().map(|n| -n)
    } else {
        text.parse::<i64>().ok()
    }
}
