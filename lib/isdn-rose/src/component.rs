//! The four top-level ROSE component kinds carried inside a Facility
//! information element: invoke, result, error, reject. Argument octets
//! are left undecoded here; the dispatch table in [`crate::dispatch`]
//! interprets them once the operation is known.

use isdn_asn1::{cursor::Cursor, decode, encode, tag};

use crate::value::OperationValue;
use crate::Error;

pub const TAG_COMPONENT_INVOKE: u32 = (tag::CLASS_CONTEXT | tag::PC_CONSTRUCTED | 1) as u32;
pub const TAG_COMPONENT_RESULT: u32 = (tag::CLASS_CONTEXT | tag::PC_CONSTRUCTED | 2) as u32;
pub const TAG_COMPONENT_ERROR: u32 = (tag::CLASS_CONTEXT | tag::PC_CONSTRUCTED | 3) as u32;
pub const TAG_COMPONENT_REJECT: u32 = (tag::CLASS_CONTEXT | tag::PC_CONSTRUCTED | 4) as u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoke {
    pub invoke_id: i32,
    pub linked_id: Option<i32>,
    pub operation: OperationValue,
    /// Raw, still-encoded invocation arguments (everything after the
    /// operation-value, inside the invoke SEQUENCE).
    pub args: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoseResult {
    pub invoke_id: i32,
    /// `None` when the result carries no operation/arguments (a bare
    /// acknowledgement).
    pub operation: Option<OperationValue>,
    pub args: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoseError {
    pub invoke_id: i32,
    pub code: OperationValue,
    pub args: Vec<u8>,
}

/// Reject problem, tagged by which component kind it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectProblem {
    General(i32),
    Invoke(i32),
    Result(i32),
    Error(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reject {
    pub invoke_id: Option<i32>,
    pub problem: RejectProblem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Invoke(Invoke),
    Result(RoseResult),
    Error(RoseError),
    Reject(Reject),
}

impl Component {
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self, Error> {
        let wire_tag = cur.tag()?;
        let len = cur.length()?;
        let body = match cur.enter(len)? {
            isdn_asn1::cursor::Body::Definite(inner) => inner,
            isdn_asn1::cursor::Body::Indefinite => {
                return Err(Error::Asn1(isdn_asn1::Error::Truncated))
            }
        };
        match wire_tag {
            TAG_COMPONENT_INVOKE => Ok(Component::Invoke(decode_invoke(body)?)),
            TAG_COMPONENT_RESULT => Ok(Component::Result(decode_result(body)?)),
            TAG_COMPONENT_ERROR => Ok(Component::Error(decode_error(body)?)),
            TAG_COMPONENT_REJECT => Ok(Component::Reject(decode_reject(body)?)),
            other => Err(Error::UnknownComponentType(other)),
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        match self {
            Component::Invoke(msg) => encode_invoke(out, msg),
            Component::Result(msg) => encode_result(out, msg),
            Component::Error(msg) => encode_error(out, msg),
            Component::Reject(msg) => encode_reject(out, msg),
        }
    }
}

fn decode_invoke(mut cur: Cursor<'_>) -> Result<Invoke, Error> {
    cur.expect_tag(tag::TAG_INTEGER)?;
    let invoke_id = decode::integer(&mut cur)?;

    let mut next_tag = cur.tag()?;
    let linked_id = if next_tag == (tag::CLASS_CONTEXT as u32 | 0) {
        let v = decode::integer(&mut cur)?;
        next_tag = cur.tag()?;
        Some(v)
    } else {
        None
    };

    let operation = OperationValue::decode_with_tag(&mut cur, next_tag)?;
    let args = cur.as_slice().to_vec();
    Ok(Invoke {
        invoke_id,
        linked_id,
        operation,
        args,
    })
}

fn decode_result(mut cur: Cursor<'_>) -> Result<RoseResult, Error> {
    cur.expect_tag(tag::TAG_INTEGER)?;
    let invoke_id = decode::integer(&mut cur)?;

    if cur.is_empty() {
        return Ok(RoseResult {
            invoke_id,
            operation: None,
            args: Vec::new(),
        });
    }

    cur.expect_tag(tag::TAG_SEQUENCE)?;
    let len = cur.length()?;
    let mut inner = match cur.enter(len)? {
        isdn_asn1::cursor::Body::Definite(inner) => inner,
        isdn_asn1::cursor::Body::Indefinite => {
            return Err(Error::Asn1(isdn_asn1::Error::Truncated))
        }
    };
    let op_tag = inner.tag()?;
    let operation = OperationValue::decode_with_tag(&mut inner, op_tag)?;
    let args = inner.as_slice().to_vec();
    Ok(RoseResult {
        invoke_id,
        operation: Some(operation),
        args,
    })
}

fn decode_error(mut cur: Cursor<'_>) -> Result<RoseError, Error> {
    cur.expect_tag(tag::TAG_INTEGER)?;
    let invoke_id = decode::integer(&mut cur)?;
    let op_tag = cur.tag()?;
    let code = OperationValue::decode_with_tag(&mut cur, op_tag)?;
    let args = cur.as_slice().to_vec();
    Ok(RoseError {
        invoke_id,
        code,
        args,
    })
}

fn decode_reject(mut cur: Cursor<'_>) -> Result<Reject, Error> {
    let first = cur.tag()?;
    let invoke_id = if first == tag::TAG_NULL {
        decode::null(&mut cur)?;
        None
    } else if first == tag::TAG_INTEGER {
        Some(decode::integer(&mut cur)?)
    } else {
        return Err(Error::Asn1(isdn_asn1::Error::UnexpectedTag(first)));
    };

    let problem_tag = cur.tag()?;
    let value = decode::integer(&mut cur)?;
    let ctx = tag::strip_pc(problem_tag) & !(tag::CLASS_MASK as u32 | tag::PC_MASK as u32);
    let problem = match ctx {
        0 => RejectProblem::General(value),
        1 => RejectProblem::Invoke(value),
        2 => RejectProblem::Result(value),
        3 => RejectProblem::Error(value),
        _ => return Err(Error::Asn1(isdn_asn1::Error::UnexpectedTag(problem_tag))),
    };
    Ok(Reject {
        invoke_id,
        problem,
    })
}


fn encode_invoke(out: &mut Vec<u8>, msg: &Invoke) -> Result<(), Error> {
    encode::constructed(out, TAG_COMPONENT_INVOKE, |body| {
        encode::integer(body, tag::TAG_INTEGER, msg.invoke_id);
        if let Some(linked_id) = msg.linked_id {
            encode::integer(body, tag::CLASS_CONTEXT as u32 | 0, linked_id);
        }
        msg.operation.encode(body)?;
        body.extend_from_slice(&msg.args);
        Ok(())
    })
}

fn encode_result(out: &mut Vec<u8>, msg: &RoseResult) -> Result<(), Error> {
    encode::constructed(out, TAG_COMPONENT_RESULT, |body| {
        encode::integer(body, tag::TAG_INTEGER, msg.invoke_id);
        if let Some(operation) = &msg.operation {
            encode::constructed(body, tag::TAG_SEQUENCE, |op_body| {
                operation.encode(op_body)?;
                op_body.extend_from_slice(&msg.args);
                Ok(())
            })?;
        }
        Ok(())
    })
}

fn encode_error(out: &mut Vec<u8>, msg: &RoseError) -> Result<(), Error> {
    encode::constructed(out, TAG_COMPONENT_ERROR, |body| {
        encode::integer(body, tag::TAG_INTEGER, msg.invoke_id);
        msg.code.encode(body)?;
        body.extend_from_slice(&msg.args);
        Ok(())
    })
}

fn encode_reject(out: &mut Vec<u8>, msg: &Reject) -> Result<(), Error> {
    encode::constructed(out, TAG_COMPONENT_REJECT, |body| {
        match msg.invoke_id {
            Some(id) => encode::integer(body, tag::TAG_INTEGER, id),
            None => encode::null(body, tag::TAG_NULL),
        }
        let (ctx, value) = match msg.problem {
            RejectProblem::General(v) => (0, v),
            RejectProblem::Invoke(v) => (1, v),
            RejectProblem::Result(v) => (2, v),
            RejectProblem::Error(v) => (3, v),
        };
        encode::integer(body, tag::CLASS_CONTEXT as u32 | ctx, value);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_roundtrips_with_linked_id_and_local_operation() {
        let msg = Invoke {
            invoke_id: 7,
            linked_id: Some(3),
            operation: OperationValue::Local(0),
            args: vec![0x04, 0x01, b'A'],
        };
        let mut buf = Vec::new();
        Component::Invoke(msg.clone()).encode(&mut buf).unwrap();
        let mut cur = Cursor::new(&buf);
        let decoded = Component::decode(&mut cur).unwrap();
        assert_eq!(decoded, Component::Invoke(msg));
    }

    #[test]
    fn result_with_no_operation_roundtrips() {
        let msg = RoseResult {
            invoke_id: 1,
            operation: None,
            args: Vec::new(),
        };
        let mut buf = Vec::new();
        Component::Result(msg.clone()).encode(&mut buf).unwrap();
        let mut cur = Cursor::new(&buf);
        assert_eq!(Component::decode(&mut cur).unwrap(), Component::Result(msg));
    }

    #[test]
    fn reject_without_invoke_id_uses_null() {
        let msg = Reject {
            invoke_id: None,
            problem: RejectProblem::General(1),
        };
        let mut buf = Vec::new();
        Component::Reject(msg.clone()).encode(&mut buf).unwrap();
        let mut cur = Cursor::new(&buf);
        assert_eq!(Component::decode(&mut cur).unwrap(), Component::Reject(msg));
    }
}
