#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rtuslave::{
    frame::Request,
    server::{dispatch, storage::HoldingStorage, validate},
    ExceptionCode,
};

#[derive(Debug, Arbitrary)]
struct FuzzInput<'a> {
    unit_id: u8,
    regs_size: u16,
    request_buf: &'a [u8],
}

fuzz_target!(|data: FuzzInput| {
    // we only care about panics so we can ignore results
    let _ = fuzz_server(data);
});

fn fuzz_server(input: FuzzInput) -> Result<(), ExceptionCode> {
    let Ok(request) = Request::parse(input.request_buf, input.unit_id) else {
        return Ok(());
    };
    let mut regs = HoldingStorage::<128>::new();
    let op = validate(&request, input.regs_size)?;
    let mut response: heapless::Vec<u8, 256> = heapless::Vec::new();
    // regs_size may exceed the bank, dispatch has to refuse instead of panicking
    let _ = dispatch(op, &mut regs, input.unit_id, &mut response);
    Ok(())
}
