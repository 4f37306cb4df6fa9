//! Template execution

use std::collections::BTreeMap;

use super::funcs::FuncContext;
use super::parser::{Branch, Command, Node, Operand, Pipeline};
use super::types::{TemplateExecuteError, MAX_EXEC_DEPTH};
use super::value::Value;
use super::TemplateSet;

type ExecResult<T> = Result<T, TemplateExecuteError>;

/// Walks a template tree and accumulates its output.
pub(crate) struct State<'a> {
    set: &'a TemplateSet,
    /// Template currently executing, for error messages
    name: String,
    vars: Vec<(String, Value)>,
    depth: usize,
    out: String,
}

impl<'a> State<'a> {
    pub(crate) fn new(set: &'a TemplateSet, name: &str, data: &Value) -> Self {
        Self {
            set,
            name: name.to_string(),
            vars: vec![(String::new(), data.clone())],
            depth: 0,
            out: String::new(),
        }
    }

    pub(crate) fn into_output(self) -> String {
        self.out
    }

    fn error(&self, line: usize, message: impl std::fmt::Display) -> TemplateExecuteError {
        TemplateExecuteError::at(&self.name, line, message)
    }

    pub(crate) fn walk(&mut self, nodes: &[Node], dot: &Value) -> ExecResult<()> {
        for node in nodes {
            match node {
                Node::Text(text) => self.out.push_str(text),
                Node::Action(pipe) => {
                    let value = self.eval_pipeline(pipe, dot)?;
                    if pipe.decl.is_empty() {
                        self.out.push_str(&value.to_output());
                    }
                }
                Node::If(branch) => self.walk_if_or_with(branch, dot, false)?,
                Node::With(branch) => self.walk_if_or_with(branch, dot, true)?,
                Node::Range(branch) => self.walk_range(branch, dot)?,
                Node::Template { name, pipe, line } => {
                    let data = match pipe {
                        Some(pipe) => self.eval_pipeline(pipe, dot)?,
                        None => Value::Nil,
                    };
                    self.walk_template(name, &data, *line)?;
                }
            }
        }
        Ok(())
    }

    fn walk_if_or_with(&mut self, branch: &Branch, dot: &Value, is_with: bool) -> ExecResult<()> {
        let mark = self.vars.len();
        let value = self.eval_pipeline(&branch.pipe, dot)?;
        let result = if value.is_truthy() {
            if is_with {
                self.walk(&branch.list, &value)
            } else {
                self.walk(&branch.list, dot)
            }
        } else if let Some(else_list) = &branch.else_list {
            self.walk(else_list, dot)
        } else {
            Ok(())
        };
        self.vars.truncate(mark);
        result
    }

    fn walk_range(&mut self, branch: &Branch, dot: &Value) -> ExecResult<()> {
        let mark = self.vars.len();
        let mut items = self.eval_range_items(&branch.pipe, dot)?.peekable();
        if items.peek().is_none() {
            if let Some(else_list) = &branch.else_list {
                self.walk(else_list, dot)?;
            }
            return Ok(());
        }
        for (key, elem) in items {
            self.vars.truncate(mark);
            match branch.pipe.decl.as_slice() {
                [elem_var] => self.vars.push((elem_var.clone(), elem.clone())),
                [key_var, elem_var] => {
                    self.vars.push((key_var.clone(), key));
                    self.vars.push((elem_var.clone(), elem.clone()));
                }
                _ => {}
            }
            let result = self.walk(&branch.list, &elem);
            if result.is_err() {
                self.vars.truncate(mark);
                return result;
            }
        }
        self.vars.truncate(mark);
        Ok(())
    }

    /// Evaluate a range pipeline without binding its declared variables.
    /// Integer counts are produced on demand.
    fn eval_range_items(
        &mut self,
        pipe: &Pipeline,
        dot: &Value,
    ) -> ExecResult<Box<dyn Iterator<Item = (Value, Value)>>> {
        let value = self.eval_commands(pipe, dot)?;
        let items: Box<dyn Iterator<Item = (Value, Value)>> = match value {
            Value::List(list) => Box::new(
                list.into_iter()
                    .enumerate()
                    .map(|(i, v)| (Value::Int(i as i64), v)),
            ),
            Value::Map(map) => Box::new(map.into_iter().map(|(k, v)| (Value::Str(k), v))),
            Value::Int(n) => Box::new((0..n.max(0)).map(|i| (Value::Int(i), Value::Int(i)))),
            Value::Nil => Box::new(std::iter::empty()),
            other => {
                return Err(self.error(
                    pipe.line,
                    format!("range can't iterate over {}", other),
                ))
            }
        };
        Ok(items)
    }

    fn walk_template(&mut self, name: &str, data: &Value, line: usize) -> ExecResult<()> {
        let set = self.set;
        let body = set
            .lookup(name)
            .ok_or_else(|| self.error(line, format!("no such template \"{}\"", name)))?;
        if self.depth >= MAX_EXEC_DEPTH {
            return Err(self.error(
                line,
                format!("exceeded maximum template depth ({})", MAX_EXEC_DEPTH),
            ));
        }
        let saved_vars = std::mem::replace(&mut self.vars, vec![(String::new(), data.clone())]);
        let saved_name = std::mem::replace(&mut self.name, name.to_string());
        self.depth += 1;
        let result = self.walk(body, data);
        self.depth -= 1;
        self.name = saved_name;
        self.vars = saved_vars;
        result
    }

    fn eval_pipeline(&mut self, pipe: &Pipeline, dot: &Value) -> ExecResult<Value> {
        let value = self.eval_commands(pipe, dot)?;
        if pipe.is_assign {
            for name in &pipe.decl {
                if let Some(slot) = self.vars.iter_mut().rev().find(|(n, _)| n == name) {
                    slot.1 = value.clone();
                }
            }
        } else {
            for name in &pipe.decl {
                self.vars.push((name.clone(), value.clone()));
            }
        }
        Ok(value)
    }

    fn eval_commands(&mut self, pipe: &Pipeline, dot: &Value) -> ExecResult<Value> {
        let mut value: Option<Value> = None;
        for cmd in &pipe.commands {
            value = Some(self.eval_command(cmd, dot, value, pipe.line)?);
        }
        Ok(value.unwrap_or_default())
    }

    fn eval_command(
        &mut self,
        cmd: &Command,
        dot: &Value,
        piped: Option<Value>,
        line: usize,
    ) -> ExecResult<Value> {
        let (first, rest) = match cmd.args.split_first() {
            Some(split) => split,
            None => return Ok(Value::Nil),
        };
        if let Operand::Func(name) = first {
            let mut args = Vec::with_capacity(rest.len() + 1);
            for arg in rest {
                args.push(self.eval_operand(arg, dot, line)?);
            }
            args.extend(piped);
            return self.call(name, &args, line);
        }
        if !rest.is_empty() || piped.is_some() {
            return Err(self.error(line, format!("can't give argument to non-function {}", first)));
        }
        self.eval_operand(first, dot, line)
    }

    fn call(&self, name: &str, args: &[Value], line: usize) -> ExecResult<Value> {
        let func = self
            .set
            .functions()
            .get(name)
            .ok_or_else(|| self.error(line, format!("function \"{}\" not defined", name)))?;
        let ctx = FuncContext {
            templates: self.set,
        };
        func(&ctx, args).map_err(|e| self.error(line, format!("error calling {}: {}", name, e)))
    }

    fn eval_operand(&mut self, operand: &Operand, dot: &Value, line: usize) -> ExecResult<Value> {
        match operand {
            Operand::Dot => Ok(dot.clone()),
            Operand::Field(chain) => self.eval_fields(dot.clone(), chain, line),
            Operand::Variable { name, fields } => {
                let value = self
                    .vars
                    .iter()
                    .rev()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| self.error(line, format!("undefined variable: ${}", name)))?;
                self.eval_fields(value, fields, line)
            }
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Func(name) => self.call(name, &[], line),
            Operand::Sub { pipe, fields } => {
                let value = self.eval_commands(pipe, dot)?;
                self.eval_fields(value, fields, line)
            }
        }
    }

    fn eval_fields(&self, mut value: Value, chain: &[String], line: usize) -> ExecResult<Value> {
        for field in chain {
            value = match value {
                Value::Map(mut map) => lookup_key(&mut map, field),
                other => {
                    return Err(self.error(
                        line,
                        format!("can't evaluate field {} in type {}", field, other.type_name()),
                    ))
                }
            };
        }
        Ok(value)
    }
}

/// Missing keys read as the empty string.
fn lookup_key(map: &mut BTreeMap<String, Value>, key: &str) -> Value {
    map.remove(key).unwrap_or_else(|| Value::Str(String::new()))
}
