use proglog_rs::server::grpc::proto::{self, log_client::LogClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut client = LogClient::connect("http://[::1]:50051").await?;

    println!("connected to server");

    println!("\nproducing records...");

    let records = vec![
        "Hello, gRPC!",
        "This is record 2",
        "Testing the distributed log",
        "Fourth record here",
    ];

    let mut offsets = Vec::new();
    for value in &records {
        let request = tonic::Request::new(proto::ProduceRequest {
            record: Some(proto::Record {
                value: value.as_bytes().to_vec(),
                offset: 0,
            }),
        });

        let response = client.produce(request).await?;
        let offset = response.into_inner().offset;
        offsets.push(offset);

        println!("  produced '{value}' -> offset {offset}");
    }

    println!("\nconsuming records (random access, reverse order)...");

    for &offset in offsets.iter().rev() {
        let request = tonic::Request::new(proto::ConsumeRequest { offset });
        let response = client.consume(request).await?;
        let record = response.into_inner().record.unwrap();
        let value = String::from_utf8_lossy(&record.value);
        println!("  offset {} -> '{}'", record.offset, value);
    }

    println!("\nstreaming the log from offset 0...");

    let mut stream = client
        .consume_stream(proto::ConsumeRequest { offset: 0 })
        .await?
        .into_inner();

    while let Some(response) = stream.message().await? {
        let record = response.record.unwrap();
        let value = String::from_utf8_lossy(&record.value);
        println!("  offset {} -> '{}'", record.offset, value);
    }

    println!("\nall operations completed");
    Ok(())
}
