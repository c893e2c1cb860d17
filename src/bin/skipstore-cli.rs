use bytes::BytesMut;
use skipstore::protocol::{Answer, Reply, ReplyValue};
use std::io::{self, BufRead, Write};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> io::Result<()> {
    let mut host = "127.0.0.1".to_string();
    let mut port = 9090u16;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--host" | "-h" => {
                if i + 1 < args.len() {
                    host = args[i + 1].clone();
                    i += 1;
                }
            }
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    if let Ok(p) = args[i + 1].parse() {
                        port = p;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    // Swallow SIGINT/SIGTERM so ^C only interrupts the current line.
    tokio::spawn(async {
        loop {
            let _ = tokio::signal::ctrl_c().await;
        }
    });
    #[cfg(unix)]
    tokio::spawn(async {
        if let Ok(mut terminate) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            loop {
                terminate.recv().await;
            }
        }
    });

    let addr = format!("{host}:{port}");
    let mut stream = TcpStream::connect(&addr).await?;
    eprintln!("Connected to {addr}");

    let stdin = io::stdin();
    let mut reader = stdin.lock();

    let mut db_index = 0u64;
    let mut in_transaction = false;

    loop {
        let db = if db_index != 0 {
            format!("[{db_index}]")
        } else {
            String::new()
        };
        print!(
            "{host}:{port}{db}{}> ",
            if in_transaction { "(TX)" } else { "" }
        );
        io::stdout().flush()?;

        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            break; // EOF
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        if line == "QUIT" {
            break;
        }

        stream.write_all(&Answer::new(line).serialize()).await?;

        // One receive burst is one Reply.
        let mut buf = BytesMut::with_capacity(4096);
        let reply = loop {
            let n = stream.read_buf(&mut buf).await?;
            if n == 0 {
                eprintln!("Connection closed by server");
                return Ok(());
            }
            match Reply::from_bytes(&buf) {
                Ok(reply) => break reply,
                Err(_) => continue, // partial frame, keep reading
            }
        };

        db_index = reply.db_index;
        in_transaction = reply.in_transaction;
        print_reply(&reply, "");
    }

    Ok(())
}

fn print_reply(reply: &Reply, lead: &str) {
    match &reply.value {
        ReplyValue::Nil => println!("(nil)"),
        ReplyValue::Integer(n) => println!("(integer) {n}"),
        ReplyValue::Error(s) => println!("(error) {s}"),
        ReplyValue::Status(s) => println!("{s}"),
        ReplyValue::String(data) => println!("\"{}\"", String::from_utf8_lossy(data)),
        ReplyValue::Array(replies) => {
            if replies.is_empty() {
                println!("(empty array)");
                return;
            }
            for (i, child) in replies.iter().enumerate() {
                let index = format!("{}) ", i + 1);
                print!("{}{index}", if i != 0 { lead } else { "" });
                print_reply(child, &format!("{lead}{}", " ".repeat(index.len())));
            }
        }
    }
}
