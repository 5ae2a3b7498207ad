use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

use crate::*;

fn framed(proc: &Procedure) -> Vec<u8> {
    let mut buf = vec![Header::new(MessageKind::PushRequest).to_byte(), 0];
    pack_proc(proc, &mut buf).expect("procedure fits in one packet");
    buf
}

fn round_trip(proc: &Procedure) -> Procedure {
    let buf = framed(proc);
    unpack_proc(&buf[PROC_BODY_OFFSET..]).expect("packed body decodes")
}

#[rstest]
#[case::block(Instruction::block("param_a", ComparisonOp::Eq, "param_b", 1))]
#[case::ifelse(Instruction::ifelse("param_a", ComparisonOp::Neq, "param_b", 1))]
#[case::set(Instruction::set("param", "value", 1))]
#[case::unop(Instruction::unop("param", UnaryOp::Inc, "result", 1))]
#[case::binop(Instruction::binop("param_a", BinaryOp::Add, "param_b", "result", 1))]
#[case::call(Instruction::call(1, 1))]
#[case::noop(Instruction::noop(1))]
fn single_instruction_round_trip(#[case] instruction: Instruction) {
    let mut proc = Procedure::new();
    proc.push(instruction).unwrap();
    assert_eq!(round_trip(&proc), proc);
}

#[test]
fn variety_round_trip() {
    let mut proc = Procedure::new();
    proc.push(Instruction::block("param_a", ComparisonOp::Le, "param_b", 1))
        .unwrap();
    proc.push(Instruction::set("param_", "1337.42", 253)).unwrap();
    proc.push(Instruction::unop("pa_ram", UnaryOp::Neg, "res_ult", 395))
        .unwrap();
    proc.push(Instruction::binop("", BinaryOp::Rsh, "b", "out", 0)).unwrap();
    proc.push(Instruction::call(255, 65535)).unwrap();
    proc.push(Instruction::noop(0)).unwrap();
    proc.push(Instruction::ifelse("x", ComparisonOp::Gt, "y", 2)).unwrap();

    assert_eq!(round_trip(&proc), proc);
}

#[test]
fn empty_strings_are_legal() {
    let mut proc = Procedure::new();
    proc.push(Instruction::set("", "", 0)).unwrap();
    assert_eq!(round_trip(&proc), proc);
}

#[test]
fn packing_does_not_mutate_the_source() {
    let mut proc = Procedure::new();
    proc.push(Instruction::binop("a", BinaryOp::Mul, "b", "c", 4)).unwrap();
    let before = proc.clone();
    let _ = framed(&proc);
    assert_eq!(proc, before);
}

#[test]
fn oversize_procedure_is_refused() {
    let mut proc = Procedure::new();
    let long = "p".repeat(120);
    for _ in 0..2 {
        proc.push(Instruction::set(long.as_str(), long.as_str(), 0)).unwrap();
    }
    assert!(proc.encoded_len() + PROC_BODY_OFFSET > PACKET_DATA_SIZE);

    let mut buf = vec![0, 0];
    assert!(matches!(
        pack_proc(&proc, &mut buf),
        Err(CodecError::ProcedureTooLarge(_))
    ));
}

#[test]
fn truncated_bodies_fail_to_decode() {
    let mut proc = Procedure::new();
    proc.push(Instruction::binop("left", BinaryOp::And, "right", "out", 9))
        .unwrap();
    let buf = framed(&proc);
    let body = &buf[PROC_BODY_OFFSET..];

    // Every proper prefix must be rejected, never mis-decoded.
    for cut in 0..body.len() {
        assert!(unpack_proc(&body[..cut]).is_err(), "prefix of {cut} bytes decoded");
    }
}

#[test]
fn unknown_type_byte_fails_to_decode() {
    // count = 1, node = 0, type = 0x2a
    let body = [1u8, 0, 0, 0x2a];
    assert!(matches!(
        unpack_proc(&body),
        Err(CodecError::UnknownInstruction(0x2a))
    ));
}

#[test]
fn unknown_operator_discriminant_fails_to_decode() {
    let mut proc = Procedure::new();
    proc.push(Instruction::unop("p", UnaryOp::Rmt, "r", 0)).unwrap();
    let mut buf = framed(&proc);

    // The operator u32 sits after count, node, type and "p\0".
    let op_offset = PROC_BODY_OFFSET + 1 + 2 + 1 + 2;
    buf[op_offset..op_offset + 4].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(
        unpack_proc(&buf[PROC_BODY_OFFSET..]),
        Err(CodecError::UnknownOperator(_))
    ));
}

fn arbitrary_name(rng: &mut StdRng) -> String {
    let len = rng.gen_range(0..12);
    rng.sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

fn arbitrary_instruction(rng: &mut StdRng) -> Instruction {
    let node = rng.gen();
    match rng.gen_range(0..7) {
        0 => Instruction::block(arbitrary_name(rng), ComparisonOp::Le, arbitrary_name(rng), node),
        1 => Instruction::ifelse(arbitrary_name(rng), ComparisonOp::Neq, arbitrary_name(rng), node),
        2 => Instruction::set(arbitrary_name(rng), arbitrary_name(rng), node),
        3 => Instruction::unop(arbitrary_name(rng), UnaryOp::Idt, arbitrary_name(rng), node),
        4 => Instruction::binop(
            arbitrary_name(rng),
            BinaryOp::Xor,
            arbitrary_name(rng),
            arbitrary_name(rng),
            node,
        ),
        5 => Instruction::call(rng.gen(), node),
        _ => Instruction::noop(node),
    }
}

#[test]
fn randomized_round_trip() {
    let rng = &mut StdRng::seed_from_u64(2322);

    for _ in 0..256 {
        let mut proc = Procedure::new();
        for _ in 0..rng.gen_range(0..8) {
            let mut probe = proc.clone();
            probe.push(arbitrary_instruction(rng)).unwrap();
            if probe.encoded_len() + PROC_BODY_OFFSET <= PACKET_DATA_SIZE {
                proc = probe;
            }
        }
        assert_eq!(round_trip(&proc), proc);
    }
}
