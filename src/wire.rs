// Frame: u16 BE total length (header included), tag byte, payload

use std::io::{Read, Write};

use tracing::debug;

use crate::board::{Color, Square};
use crate::error::WireError;
use crate::movegen::Move;

const TAG_COLOUR: u8 = 0x00;
const TAG_MOVE: u8 = 0x01;
const TAG_INITIAL_MOVES: u8 = 0x02;
const TAG_PASS: u8 = 0x03;

const HEADER_LEN: usize = 2;
const MAX_FRAME_LEN: usize = u16::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    OpponentColour(Color),
    Move(Move),
    InitialMoves(Option<String>),
}

pub fn encode(message: &Message) -> Result<Vec<u8>, WireError> {
    let mut body = Vec::new();
    match message {
        Message::OpponentColour(color) => {
            body.push(TAG_COLOUR);
            body.push(match color {
                Color::Black => b'B',
                Color::White => b'W',
            });
        }
        Message::Move(Move::Place(square)) => {
            body.extend_from_slice(&[TAG_MOVE, square.row(), square.col()]);
        }
        Message::Move(Move::Pass) => body.push(TAG_PASS),
        Message::InitialMoves(moves) => {
            body.push(TAG_INITIAL_MOVES);
            match moves {
                Some(text) => {
                    body.push(1);
                    body.extend_from_slice(text.as_bytes());
                }
                None => body.push(0),
            }
        }
    }

    let total = body.len() + HEADER_LEN;
    if total > MAX_FRAME_LEN {
        return Err(WireError::Malformed(format!("frame of {total} bytes does not fit a u16 length")));
    }
    let mut frame = Vec::with_capacity(total);
    frame.extend_from_slice(&(total as u16).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

pub fn decode_body(body: &[u8]) -> Result<Message, WireError> {
    let (&tag, payload) = body
        .split_first()
        .ok_or_else(|| WireError::Malformed("empty frame".to_string()))?;

    match tag {
        TAG_COLOUR => match payload {
            [b'B'] => Ok(Message::OpponentColour(Color::Black)),
            [b'W'] => Ok(Message::OpponentColour(Color::White)),
            _ => Err(WireError::Malformed(format!("bad colour payload {payload:?}"))),
        },
        TAG_MOVE => match payload {
            &[row, col] => Square::new(row, col)
                .map(|square| Message::Move(Move::Place(square)))
                .ok_or_else(|| WireError::Malformed(format!("square ({row}, {col}) is off the board"))),
            _ => Err(WireError::Malformed(format!("move payload has {} bytes", payload.len()))),
        },
        TAG_PASS if payload.is_empty() => Ok(Message::Move(Move::Pass)),
        TAG_PASS => Err(WireError::Malformed("pass frame carries a payload".to_string())),
        TAG_INITIAL_MOVES => match payload.split_first() {
            Some((0, [])) => Ok(Message::InitialMoves(None)),
            Some((1, text)) => String::from_utf8(text.to_vec())
                .map(|text| Message::InitialMoves(Some(text)))
                .map_err(|err| WireError::Malformed(err.to_string())),
            _ => Err(WireError::Malformed("bad initial moves payload".to_string())),
        },
        other => Err(WireError::UnknownTag(other)),
    }
}

#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn next_message(&mut self) -> Result<Option<Message>, WireError> {
        if self.buffer.len() < HEADER_LEN {
            return Ok(None);
        }
        let total = u16::from_be_bytes([self.buffer[0], self.buffer[1]]) as usize;
        if total <= HEADER_LEN {
            return Err(WireError::Malformed(format!("frame length {total} leaves no room for a tag")));
        }
        if self.buffer.len() < total {
            return Ok(None);
        }

        let frame: Vec<u8> = self.buffer.drain(..total).collect();
        decode_body(&frame[HEADER_LEN..]).map(Some)
    }
}

pub struct MoveExchange<S> {
    stream: S,
    decoder: FrameDecoder,
}

impl<S: Read + Write> MoveExchange<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(),
        }
    }

    pub fn send(&mut self, message: &Message) -> Result<(), WireError> {
        let frame = encode(message)?;
        self.stream.write_all(&frame)?;
        self.stream.flush()?;
        debug!(?message, bytes = frame.len(), "sent frame");
        Ok(())
    }

    pub fn send_move(&mut self, mv: Move) -> Result<(), WireError> {
        self.send(&Message::Move(mv))
    }

    pub fn receive(&mut self) -> Result<Message, WireError> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(message) = self.decoder.next_message()? {
                debug!(?message, "received frame");
                return Ok(message);
            }
            let read = self.stream.read(&mut chunk)?;
            if read == 0 {
                return Err(WireError::Closed);
            }
            self.decoder.push(&chunk[..read]);
        }
    }

    pub fn receive_move(&mut self) -> Result<Move, WireError> {
        match self.receive()? {
            Message::Move(mv) => Ok(mv),
            other => Err(WireError::Unexpected(format!("{other:?}"))),
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}
